use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, EntityTrait};
use serde::{Deserialize, Serialize};

use crate::entities::watch_state::{self, Column as StateCol, Entity as StateEntity};
use crate::store::Store;

/// Last-run bookkeeping for one technology's watcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchStateRow {
    pub technology: String,
    pub last_run_at: DateTime<Utc>,
    pub last_item_count: i32,
    pub last_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    pub async fn get_watch_state(&self, technology: &str) -> Result<Option<WatchStateRow>> {
        let model = StateEntity::find_by_id(technology).one(self.db()).await?;
        Ok(model.map(|m| WatchStateRow {
            technology: m.technology,
            last_run_at: m.last_run_at.with_timezone(&Utc),
            last_item_count: m.last_item_count,
            last_error: m.last_error,
            updated_at: m.updated_at.with_timezone(&Utc),
        }))
    }

    pub async fn upsert_watch_state(
        &self,
        technology: &str,
        last_run_at: DateTime<Utc>,
        last_item_count: i32,
        last_error: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now().fixed_offset();
        let am = watch_state::ActiveModel {
            technology: Set(technology.to_string()),
            last_run_at: Set(last_run_at.fixed_offset()),
            last_item_count: Set(last_item_count),
            last_error: Set(last_error.map(|s| s.to_string())),
            updated_at: Set(now),
        };
        StateEntity::insert(am)
            .on_conflict(
                OnConflict::column(StateCol::Technology)
                    .update_columns([
                        StateCol::LastRunAt,
                        StateCol::LastItemCount,
                        StateCol::LastError,
                        StateCol::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(self.db())
            .await?;
        Ok(())
    }
}
