use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "item_audits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub item_id: String,
    pub auditor_setting_id: Option<String>,
    pub score: i32,
    pub issue: String,
    pub notes: Option<String>,
    pub action_instructions: Option<String>,
    pub justified: bool,
    pub justification: Option<String>,
    pub justified_date: Option<DateTimeWithTimeZone>,
    /// Set when a prior pass's issue is not re-raised by the current one.
    pub fixed: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
