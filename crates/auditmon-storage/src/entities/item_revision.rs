use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "item_revisions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub item_id: String,
    /// Opaque JSON config snapshot.
    pub config: String,
    /// Whether this revision is the resource's live state.
    pub active: bool,
    pub date_created: DateTimeWithTimeZone,
    /// Last time only ephemeral fields changed between polls.
    pub date_last_ephemeral_change: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
