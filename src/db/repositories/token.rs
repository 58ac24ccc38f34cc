use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::auth_tokens;

/// Session token store: one opaque key per user, reused across logins.
pub struct TokenRepository {
    conn: DatabaseConnection,
}

impl TokenRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Returns the user's existing key or issues a new one.
    pub async fn get_or_create(&self, user_id: i32) -> Result<String> {
        if let Some(key) = self.get_for_user(user_id).await? {
            return Ok(key);
        }

        let active = auth_tokens::ActiveModel {
            key: Set(generate_token_key()),
            user_id: Set(user_id),
            created_at: Set(Utc::now()),
        };

        match active.insert(&self.conn).await {
            Ok(model) => Ok(model.key),
            // Lost a race with a concurrent login for the same user
            Err(e) => self
                .get_for_user(user_id)
                .await?
                .ok_or(e)
                .context("Failed to create auth token"),
        }
    }

    pub async fn get_for_user(&self, user_id: i32) -> Result<Option<String>> {
        let token = auth_tokens::Entity::find()
            .filter(auth_tokens::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query auth token by user")?;

        Ok(token.map(|t| t.key))
    }

    /// Resolves a presented key to its owner.
    pub async fn find_user_id(&self, key: &str) -> Result<Option<i32>> {
        let token = auth_tokens::Entity::find_by_id(key.to_string())
            .one(&self.conn)
            .await
            .context("Failed to query auth token by key")?;

        Ok(token.map(|t| t.user_id))
    }
}

/// Generate a random session key (40 character hex string)
#[must_use]
pub fn generate_token_key() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 20] = rng.random();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_keys_are_40_hex_chars_and_unique() {
        let a = generate_token_key();
        let b = generate_token_key();
        assert_eq!(a.len(), 40);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
