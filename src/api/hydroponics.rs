use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{ApiError, ApiResponse, AppState};
use crate::services::{CreatedSystem, LatestReading, StoredReading, SystemRequest};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateSystemRequest {
    pub name: Option<String>,
    pub plant_type: Option<String>,
}

/// Values stay untyped so that strings and numbers both reach validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Dht22Request {
    pub temperature: Option<Value>,
    pub humidity: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ReadingSaved {
    pub message: &'static str,
    #[serde(flatten)]
    pub reading: StoredReading,
}

/// POST /hydroponics/create-system/
///
/// The body is optional.
pub async fn create_system(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    payload: Result<Option<Json<CreateSystemRequest>>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedSystem>>), ApiError> {
    let Json(payload) = payload?.unwrap_or_default();

    let created = state
        .shared
        .hydroponics_service
        .create_system(
            user.id,
            SystemRequest {
                name: payload.name,
                plant_type: payload.plant_type,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

/// POST /hydroponics/dht22-data/
pub async fn submit_dht22(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    payload: Result<Json<Dht22Request>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<ReadingSaved>>), ApiError> {
    let Json(payload) = payload?;
    let reading = state
        .shared
        .hydroponics_service
        .submit_reading(user.id, payload.temperature, payload.humidity)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(ReadingSaved {
            message: "DHT22 data saved successfully",
            reading,
        })),
    ))
}

/// GET /hydroponics/dht22-data/
pub async fn latest_dht22(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<LatestReading>>, ApiError> {
    let latest = state
        .shared
        .hydroponics_service
        .latest_reading(user.id)
        .await?;

    Ok(Json(ApiResponse::success(latest)))
}
