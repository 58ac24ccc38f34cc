use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use crate::domain::DataType;
use crate::entities::{prelude::*, smar_tanom_data};

/// Append-only access to `smar_tanom_data`; rows are never updated or deleted.
pub struct ReadingRepository {
    conn: DatabaseConnection,
}

impl ReadingRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Writes all samples with one shared timestamp, atomically.
    pub async fn append(
        &self,
        sensor_id: i32,
        samples: &[(DataType, f64)],
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        let txn = self.conn.begin().await?;

        for (data_type, value) in samples {
            let row = smar_tanom_data::ActiveModel {
                sensor_id: Set(sensor_id),
                value: Set(*value),
                data_type: Set(data_type.as_str().to_string()),
                created_at: Set(created_at),
                ..Default::default()
            };
            SmarTanomData::insert(row)
                .exec(&txn)
                .await
                .with_context(|| format!("Failed to insert {data_type} reading"))?;
        }

        txn.commit().await?;
        Ok(())
    }

    /// Most recent row of one type for a sensor. Ties on `created_at` go to
    /// the later insert.
    pub async fn latest(
        &self,
        sensor_id: i32,
        data_type: DataType,
    ) -> Result<Option<smar_tanom_data::Model>> {
        SmarTanomData::find()
            .filter(smar_tanom_data::Column::SensorId.eq(sensor_id))
            .filter(smar_tanom_data::Column::DataType.eq(data_type.as_str()))
            .order_by_desc(smar_tanom_data::Column::CreatedAt)
            .order_by_desc(smar_tanom_data::Column::Id)
            .one(&self.conn)
            .await
            .context("Failed to query latest reading")
    }
}
