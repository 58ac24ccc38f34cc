use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "smar_tanoms")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub hydroponic_id: i32,
    pub name: String,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::hydroponics::Entity",
        from = "Column::HydroponicId",
        to = "super::hydroponics::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Hydroponic,
    #[sea_orm(has_many = "super::sensors::Entity")]
    Sensors,
}

impl Related<super::hydroponics::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Hydroponic.def()
    }
}

impl Related<super::sensors::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sensors.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
