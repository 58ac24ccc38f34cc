//! Domain service for hydroponic systems and DHT22 readings.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{FieldErrors, SystemId, UserId};

#[derive(Debug, Error)]
pub enum HydroponicsError {
    #[error("DHT22 sensor not found for this user")]
    SensorNotFound,

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for HydroponicsError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for HydroponicsError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

/// Optional overrides for a new system. Missing fields use the defaults.
#[derive(Debug, Clone, Default)]
pub struct SystemRequest {
    pub name: Option<String>,
    pub plant_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedSystem {
    pub system_id: SystemId,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredReading {
    pub temperature: f64,
    pub humidity: f64,
    pub timestamp: DateTime<Utc>,
}

/// Most recent value per data type. Fields are `None` when nothing was
/// recorded yet.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct LatestReading {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[async_trait::async_trait]
pub trait HydroponicsService: Send + Sync {
    /// Creates a hydroponic system with one SmarTanom unit and one DHT22
    /// sensor. Every call creates a new system.
    async fn create_system(
        &self,
        user_id: UserId,
        request: SystemRequest,
    ) -> Result<CreatedSystem, HydroponicsError>;

    /// Validates and stores one temperature/humidity sample.
    ///
    /// # Errors
    ///
    /// [`HydroponicsError::Validation`] writes nothing;
    /// [`HydroponicsError::SensorNotFound`] when the user has no DHT22 sensor.
    async fn submit_reading(
        &self,
        user_id: UserId,
        temperature: Option<Value>,
        humidity: Option<Value>,
    ) -> Result<StoredReading, HydroponicsError>;

    async fn latest_reading(&self, user_id: UserId) -> Result<LatestReading, HydroponicsError>;
}
