use crate::entities::{prelude::*, sensors, smar_tanom_data};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const READING_INDEX: &str = "idx_smar_tanom_data_sensor_type_created";
const SENSOR_INDEX: &str = "idx_sensors_smar_tanom_type";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Serves the per-type "latest reading" lookups
        manager
            .create_index(
                Index::create()
                    .name(READING_INDEX)
                    .table(SmarTanomData)
                    .col(smar_tanom_data::Column::SensorId)
                    .col(smar_tanom_data::Column::DataType)
                    .col(smar_tanom_data::Column::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(SENSOR_INDEX)
                    .table(Sensors)
                    .col(sensors::Column::SmarTanomId)
                    .col(sensors::Column::SensorType)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name(SENSOR_INDEX).table(Sensors).to_owned())
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name(READING_INDEX)
                    .table(SmarTanomData)
                    .to_owned(),
            )
            .await
    }
}
