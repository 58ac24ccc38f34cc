use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sensors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub smar_tanom_id: i32,
    /// Hardware model, e.g. "DHT22"
    pub sensor_type: String,
    pub unit: String,
    pub status: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::smar_tanoms::Entity",
        from = "Column::SmarTanomId",
        to = "super::smar_tanoms::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    SmarTanom,
    #[sea_orm(has_many = "super::smar_tanom_data::Entity")]
    Readings,
}

impl Related<super::smar_tanoms::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SmarTanom.def()
    }
}

impl Related<super::smar_tanom_data::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Readings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
