use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, JoinType,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};

use crate::entities::{hydroponics, sensors, smar_tanoms};

/// Everything needed to provision one system: the hydroponic deployment, its
/// SmarTanom unit and the sensor attached to it.
#[derive(Debug, Clone)]
pub struct NewSystem<'a> {
    pub user_id: i32,
    pub name: &'a str,
    pub plant_type: &'a str,
    pub start_date: NaiveDate,
    pub unit_name: &'a str,
    pub unit_status: &'a str,
    pub sensor_type: &'a str,
    pub sensor_unit: &'a str,
    pub sensor_status: &'a str,
}

#[derive(Debug, Clone, Copy)]
pub struct ProvisionedSystem {
    pub hydroponic_id: i32,
    pub smar_tanom_id: i32,
    pub sensor_id: i32,
}

pub struct HydroponicRepository {
    conn: DatabaseConnection,
}

impl HydroponicRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Creates the Hydroponic → SmarTanom → Sensor chain in one transaction.
    pub async fn create_system(
        &self,
        system: NewSystem<'_>,
        now: DateTime<Utc>,
    ) -> Result<ProvisionedSystem> {
        let txn = self.conn.begin().await?;

        let hydroponic = hydroponics::ActiveModel {
            user_id: Set(system.user_id),
            name: Set(system.name.to_string()),
            plant_type: Set(system.plant_type.to_string()),
            start_date: Set(system.start_date),
            end_date: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert hydroponic")?;

        let unit = smar_tanoms::ActiveModel {
            hydroponic_id: Set(hydroponic.id),
            name: Set(system.unit_name.to_string()),
            status: Set(system.unit_status.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert SmarTanom unit")?;

        let sensor = sensors::ActiveModel {
            smar_tanom_id: Set(unit.id),
            sensor_type: Set(system.sensor_type.to_string()),
            unit: Set(system.sensor_unit.to_string()),
            status: Set(system.sensor_status.to_string()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert sensor")?;

        txn.commit().await?;

        Ok(ProvisionedSystem {
            hydroponic_id: hydroponic.id,
            smar_tanom_id: unit.id,
            sensor_id: sensor.id,
        })
    }

    /// Finds the owner's newest sensor of the given type.
    pub async fn find_sensor_for_user(
        &self,
        user_id: i32,
        sensor_type: &str,
    ) -> Result<Option<sensors::Model>> {
        sensors::Entity::find()
            .join(JoinType::InnerJoin, sensors::Relation::SmarTanom.def())
            .join(JoinType::InnerJoin, smar_tanoms::Relation::Hydroponic.def())
            .filter(hydroponics::Column::UserId.eq(user_id))
            .filter(sensors::Column::SensorType.eq(sensor_type))
            .order_by_desc(sensors::Column::Id)
            .one(&self.conn)
            .await
            .context("Failed to query sensor for user")
    }
}
