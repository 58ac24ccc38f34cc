//! `SeaORM` implementation of the `HydroponicsService` trait.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::SensorsConfig;
use crate::db::{NewSystem, Store};
use crate::domain::reading::{DHT22, ReadingBounds, parse_dht22, round_to};
use crate::domain::{DataType, SystemId, UserId};
use crate::entities::sensors;
use crate::services::hydroponics_service::{
    CreatedSystem, HydroponicsError, HydroponicsService, LatestReading, StoredReading,
    SystemRequest,
};

pub const DEFAULT_SYSTEM_NAME: &str = "Lettuce Farm";
pub const DEFAULT_PLANT_TYPE: &str = "Lettuce Romaine";
const UNIT_NAME: &str = "Main SmarTanom";
const ACTIVE: &str = "active";
const DHT22_UNIT: &str = "°C/%";

pub struct SeaOrmHydroponicsService {
    store: Store,
    sensors: SensorsConfig,
}

impl SeaOrmHydroponicsService {
    #[must_use]
    pub const fn new(store: Store, sensors: SensorsConfig) -> Self {
        Self { store, sensors }
    }

    async fn dht22_sensor(&self, user_id: UserId) -> Result<sensors::Model, HydroponicsError> {
        self.store
            .find_sensor_for_user(user_id.value(), DHT22)
            .await?
            .ok_or(HydroponicsError::SensorNotFound)
    }

    fn present(&self, value: f64) -> f64 {
        self.sensors
            .round_digits
            .map_or(value, |digits| round_to(value, digits))
    }
}

fn non_blank(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[async_trait]
impl HydroponicsService for SeaOrmHydroponicsService {
    async fn create_system(
        &self,
        user_id: UserId,
        request: SystemRequest,
    ) -> Result<CreatedSystem, HydroponicsError> {
        let name = non_blank(request.name, DEFAULT_SYSTEM_NAME);
        let plant_type = non_blank(request.plant_type, DEFAULT_PLANT_TYPE);
        let now = Utc::now();

        let provisioned = self
            .store
            .create_system(
                NewSystem {
                    user_id: user_id.value(),
                    name: &name,
                    plant_type: &plant_type,
                    start_date: now.date_naive(),
                    unit_name: UNIT_NAME,
                    unit_status: ACTIVE,
                    sensor_type: DHT22,
                    sensor_unit: DHT22_UNIT,
                    sensor_status: ACTIVE,
                },
                now,
            )
            .await?;

        info!(
            user_id = %user_id,
            system_id = provisioned.hydroponic_id,
            sensor_id = provisioned.sensor_id,
            "Hydroponic system created"
        );
        metrics::counter!("smartanom_systems_created_total").increment(1);

        Ok(CreatedSystem {
            system_id: SystemId::new(provisioned.hydroponic_id),
            message: "Hydroponic system created successfully".to_string(),
        })
    }

    async fn submit_reading(
        &self,
        user_id: UserId,
        temperature: Option<Value>,
        humidity: Option<Value>,
    ) -> Result<StoredReading, HydroponicsError> {
        let bounds = ReadingBounds::from_config(&self.sensors);
        let reading = parse_dht22(temperature.as_ref(), humidity.as_ref(), bounds.as_ref())
            .map_err(HydroponicsError::Validation)?;

        let sensor = self.dht22_sensor(user_id).await?;
        let now = Utc::now();

        self.store
            .append_readings(
                sensor.id,
                &[
                    (DataType::Temperature, reading.temperature),
                    (DataType::Humidity, reading.humidity),
                ],
                now,
            )
            .await?;

        debug!(
            sensor_id = sensor.id,
            temperature = reading.temperature,
            humidity = reading.humidity,
            "DHT22 reading stored"
        );
        metrics::counter!("smartanom_readings_total").increment(1);

        Ok(StoredReading {
            temperature: reading.temperature,
            humidity: reading.humidity,
            timestamp: now,
        })
    }

    async fn latest_reading(&self, user_id: UserId) -> Result<LatestReading, HydroponicsError> {
        let sensor = self.dht22_sensor(user_id).await?;

        let temperature = self
            .store
            .latest_reading(sensor.id, DataType::Temperature)
            .await?;
        let humidity = self
            .store
            .latest_reading(sensor.id, DataType::Humidity)
            .await?;

        Ok(LatestReading {
            temperature: temperature.as_ref().map(|row| self.present(row.value)),
            humidity: humidity.as_ref().map(|row| self.present(row.value)),
            timestamp: temperature
                .as_ref()
                .or(humidity.as_ref())
                .map(|row| row.created_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityConfig;
    use crate::db::{InsertOutcome, NewUser};
    use crate::entities::smar_tanom_data;
    use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
    use serde_json::json;

    async fn setup() -> (SeaOrmHydroponicsService, UserId) {
        let store = Store::with_pool_options("sqlite::memory:", 1, 1)
            .await
            .unwrap();
        let security = SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        };
        let outcome = store
            .create_user(
                NewUser {
                    email: "farm@example.com",
                    name: "Farmer",
                    contact: "",
                    password: "lettuce-123",
                },
                &security,
            )
            .await
            .unwrap();
        let InsertOutcome::Created(user) = outcome else {
            panic!("duplicate");
        };
        (
            SeaOrmHydroponicsService::new(store, SensorsConfig::default()),
            UserId::new(user.id),
        )
    }

    #[tokio::test]
    async fn readings_require_a_sensor() {
        let (svc, user) = setup().await;

        let err = svc
            .submit_reading(user, Some(json!(21.5)), Some(json!(60.2)))
            .await
            .unwrap_err();
        assert!(matches!(err, HydroponicsError::SensorNotFound));
        assert!(matches!(
            svc.latest_reading(user).await.unwrap_err(),
            HydroponicsError::SensorNotFound
        ));
    }

    #[tokio::test]
    async fn latest_is_null_until_first_reading() {
        let (svc, user) = setup().await;
        svc.create_system(user, SystemRequest::default()).await.unwrap();

        assert_eq!(svc.latest_reading(user).await.unwrap(), LatestReading::default());
    }

    #[tokio::test]
    async fn submit_then_read_back_exact_values() {
        let (svc, user) = setup().await;
        let created = svc.create_system(user, SystemRequest::default()).await.unwrap();
        assert!(created.system_id.value() > 0);

        let stored = svc
            .submit_reading(user, Some(json!(21.5)), Some(json!("60.2")))
            .await
            .unwrap();

        let latest = svc.latest_reading(user).await.unwrap();
        assert_eq!(latest.temperature, Some(21.5));
        assert_eq!(latest.humidity, Some(60.2));
        assert!(latest.timestamp.is_some());
        assert_eq!(
            latest.timestamp.map(|t| t.timestamp()),
            Some(stored.timestamp.timestamp())
        );
    }

    #[tokio::test]
    async fn invalid_reading_writes_nothing() {
        let (svc, user) = setup().await;
        svc.create_system(user, SystemRequest::default()).await.unwrap();

        let err = svc
            .submit_reading(user, Some(json!("hot")), Some(json!(50)))
            .await
            .unwrap_err();
        let HydroponicsError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.get("temperature").is_some());

        let sensor = svc.dht22_sensor(user).await.unwrap();
        let rows = smar_tanom_data::Entity::find()
            .filter(smar_tanom_data::Column::SensorId.eq(sensor.id))
            .count(&svc.store.conn)
            .await
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[test]
    fn blank_overrides_fall_back_to_defaults() {
        assert_eq!(non_blank(None, DEFAULT_SYSTEM_NAME), DEFAULT_SYSTEM_NAME);
        assert_eq!(non_blank(Some("  ".into()), DEFAULT_PLANT_TYPE), DEFAULT_PLANT_TYPE);
        assert_eq!(non_blank(Some(" Basil ".into()), DEFAULT_PLANT_TYPE), "Basil");
    }
}
