use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Normalized on write (domain part lowercased)
    #[sea_orm(unique)]
    pub email: String,

    pub name: String,

    pub contact: String,

    /// Argon2id password hash
    pub password_hash: String,

    pub is_active: bool,

    pub email_verified: bool,

    pub failed_login_attempts: i32,

    pub last_failed_login: Option<DateTimeUtc>,

    pub last_login: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::hydroponics::Entity")]
    Hydroponics,
    #[sea_orm(has_one = "super::auth_tokens::Entity")]
    AuthToken,
}

impl Related<super::hydroponics::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Hydroponics.def()
    }
}

impl Related<super::auth_tokens::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuthToken.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
