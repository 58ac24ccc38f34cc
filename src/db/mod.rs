use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;
use crate::domain::DataType;
use crate::entities::{sensors, smar_tanom_data};

pub mod migrator;
pub mod repositories;

pub use repositories::hydroponic::{NewSystem, ProvisionedSystem};
pub use repositories::user::{InsertOutcome, NewUser, User};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn token_repo(&self) -> repositories::token::TokenRepository {
        repositories::token::TokenRepository::new(self.conn.clone())
    }

    fn hydroponic_repo(&self) -> repositories::hydroponic::HydroponicRepository {
        repositories::hydroponic::HydroponicRepository::new(self.conn.clone())
    }

    fn reading_repo(&self) -> repositories::reading::ReadingRepository {
        repositories::reading::ReadingRepository::new(self.conn.clone())
    }

    // Users

    pub async fn create_user(
        &self,
        new_user: NewUser<'_>,
        security: &SecurityConfig,
    ) -> Result<InsertOutcome> {
        self.user_repo().create(new_user, security).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user_by_email_with_password(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>> {
        self.user_repo().get_by_email_with_password(email).await
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_with_password(&self, id: i32) -> Result<Option<(User, String)>> {
        self.user_repo().get_by_id_with_password(id).await
    }

    pub async fn activate_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().activate(id).await
    }

    pub async fn record_failed_login(&self, id: i32, now: DateTime<Utc>) -> Result<u32> {
        self.user_repo().record_failed_login(id, now).await
    }

    pub async fn reset_failed_logins(&self, id: i32) -> Result<()> {
        self.user_repo().reset_failed_logins(id).await
    }

    pub async fn record_successful_login(&self, id: i32, now: DateTime<Utc>) -> Result<()> {
        self.user_repo().record_successful_login(id, now).await
    }

    pub async fn update_user_profile(
        &self,
        id: i32,
        name: Option<&str>,
        contact: Option<&str>,
    ) -> Result<Option<User>> {
        self.user_repo().update_profile(id, name, contact).await
    }

    pub async fn verify_password(&self, password_hash: String, password: &str) -> Result<bool> {
        repositories::user::verify_password_hash(password_hash, password).await
    }

    // Session tokens

    pub async fn get_or_create_token(&self, user_id: i32) -> Result<String> {
        self.token_repo().get_or_create(user_id).await
    }

    pub async fn find_token_owner(&self, key: &str) -> Result<Option<i32>> {
        self.token_repo().find_user_id(key).await
    }

    // Hydroponic systems

    pub async fn create_system(
        &self,
        system: NewSystem<'_>,
        now: DateTime<Utc>,
    ) -> Result<ProvisionedSystem> {
        self.hydroponic_repo().create_system(system, now).await
    }

    pub async fn find_sensor_for_user(
        &self,
        user_id: i32,
        sensor_type: &str,
    ) -> Result<Option<sensors::Model>> {
        self.hydroponic_repo()
            .find_sensor_for_user(user_id, sensor_type)
            .await
    }

    // Readings

    pub async fn append_readings(
        &self,
        sensor_id: i32,
        samples: &[(DataType, f64)],
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        self.reading_repo()
            .append(sensor_id, samples, created_at)
            .await
    }

    pub async fn latest_reading(
        &self,
        sensor_id: i32,
        data_type: DataType,
    ) -> Result<Option<smar_tanom_data::Model>> {
        self.reading_repo().latest(sensor_id, data_type).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::hydroponics;
    use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

    fn fast_security() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        }
    }

    async fn memory_store() -> Store {
        Store::with_pool_options("sqlite::memory:", 1, 1)
            .await
            .expect("in-memory store")
    }

    async fn seed_user(store: &Store, email: &str) -> User {
        let outcome = store
            .create_user(
                NewUser {
                    email,
                    name: "Grower",
                    contact: "",
                    password: "lettuce-123",
                },
                &fast_security(),
            )
            .await
            .unwrap();
        match outcome {
            InsertOutcome::Created(user) => user,
            InsertOutcome::DuplicateEmail => panic!("unexpected duplicate"),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_reported() {
        let store = memory_store().await;
        let user = seed_user(&store, "a@example.com").await;
        assert!(!user.is_active);
        assert!(!user.email_verified);

        let outcome = store
            .create_user(
                NewUser {
                    email: "a@example.com",
                    name: "Other",
                    contact: "",
                    password: "lettuce-123",
                },
                &fast_security(),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, InsertOutcome::DuplicateEmail));
    }

    #[tokio::test]
    async fn failed_login_counter_increments_and_resets() {
        let store = memory_store().await;
        let user = seed_user(&store, "b@example.com").await;
        let now = Utc::now();

        assert_eq!(store.record_failed_login(user.id, now).await.unwrap(), 1);
        assert_eq!(store.record_failed_login(user.id, now).await.unwrap(), 2);

        let reloaded = store.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.failed_login_attempts, 2);
        assert!(reloaded.last_failed_login.is_some());

        store.reset_failed_logins(user.id).await.unwrap();
        let reloaded = store.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.failed_login_attempts, 0);
        assert!(reloaded.last_failed_login.is_none());
    }

    #[tokio::test]
    async fn token_is_reused_per_user() {
        let store = memory_store().await;
        let user = seed_user(&store, "c@example.com").await;

        let first = store.get_or_create_token(user.id).await.unwrap();
        let second = store.get_or_create_token(user.id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.find_token_owner(&first).await.unwrap(), Some(user.id));
        assert_eq!(store.find_token_owner("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn newest_sensor_wins_and_latest_reading_per_type() {
        let store = memory_store().await;
        let user = seed_user(&store, "d@example.com").await;
        let now = Utc::now();

        let system = |name: &'static str| NewSystem {
            user_id: user.id,
            name,
            plant_type: "Lettuce Romaine",
            start_date: now.date_naive(),
            unit_name: "Main SmarTanom",
            unit_status: "active",
            sensor_type: "DHT22",
            sensor_unit: "°C/%",
            sensor_status: "active",
        };

        let first = store.create_system(system("One"), now).await.unwrap();
        let second = store.create_system(system("Two"), now).await.unwrap();
        let systems = hydroponics::Entity::find()
            .filter(hydroponics::Column::UserId.eq(user.id))
            .count(&store.conn)
            .await
            .unwrap();
        assert_eq!(systems, 2);

        let sensor = store
            .find_sensor_for_user(user.id, "DHT22")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sensor.id, second.sensor_id);
        assert_ne!(sensor.id, first.sensor_id);

        store
            .append_readings(
                sensor.id,
                &[(DataType::Temperature, 20.0), (DataType::Humidity, 55.0)],
                now,
            )
            .await
            .unwrap();
        store
            .append_readings(
                sensor.id,
                &[(DataType::Temperature, 22.5), (DataType::Humidity, 58.0)],
                now + chrono::Duration::seconds(5),
            )
            .await
            .unwrap();

        let t = store
            .latest_reading(sensor.id, DataType::Temperature)
            .await
            .unwrap()
            .unwrap();
        let h = store
            .latest_reading(sensor.id, DataType::Humidity)
            .await
            .unwrap()
            .unwrap();
        assert!((t.value - 22.5).abs() < f64::EPSILON);
        assert!((h.value - 58.0).abs() < f64::EPSILON);
        let rows = smar_tanom_data::Entity::find()
            .filter(smar_tanom_data::Column::SensorId.eq(sensor.id))
            .count(&store.conn)
            .await
            .unwrap();
        assert_eq!(rows, 4);

        assert!(
            store
                .find_sensor_for_user(user.id + 1, "DHT22")
                .await
                .unwrap()
                .is_none()
        );
    }
}
