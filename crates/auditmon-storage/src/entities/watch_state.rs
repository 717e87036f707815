use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "watch_state")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub technology: String,
    pub last_run_at: DateTimeWithTimeZone,
    pub last_item_count: i32,
    pub last_error: Option<String>,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
