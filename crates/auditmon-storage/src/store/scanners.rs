use anyhow::Result;
use auditmon_common::id::next_id;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use serde::{Deserialize, Serialize};

use crate::entities::scanner_config::{self, Column as ScanCol, Entity as ScanEntity};
use crate::error::StorageError;
use crate::store::Store;

/// One configured external image-scanner endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfigRow {
    pub id: String,
    pub name: String,
    pub username: String,
    pub password: String,
    pub url: String,
    pub ssl_verify: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn model_to_row(m: scanner_config::Model) -> ScannerConfigRow {
    ScannerConfigRow {
        id: m.id,
        name: m.name,
        username: m.username,
        password: m.password,
        url: m.url,
        ssl_verify: m.ssl_verify,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl Store {
    pub async fn insert_scanner_config(
        &self,
        name: &str,
        username: &str,
        password: &str,
        url: &str,
        ssl_verify: bool,
    ) -> Result<ScannerConfigRow> {
        let now = Utc::now().fixed_offset();
        let am = scanner_config::ActiveModel {
            id: Set(next_id()),
            name: Set(name.to_string()),
            username: Set(username.to_string()),
            password: Set(password.to_string()),
            url: Set(url.to_string()),
            ssl_verify: Set(ssl_verify),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(model_to_row(am.insert(self.db()).await?))
    }

    pub async fn get_scanner_config(&self, id: &str) -> Result<Option<ScannerConfigRow>> {
        let model = ScanEntity::find_by_id(id).one(self.db()).await?;
        Ok(model.map(model_to_row))
    }

    pub async fn list_scanner_configs(&self) -> Result<Vec<ScannerConfigRow>> {
        let rows = ScanEntity::find()
            .order_by_asc(ScanCol::Name)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(model_to_row).collect())
    }

    pub async fn update_scanner_config(
        &self,
        id: &str,
        name: &str,
        username: &str,
        password: &str,
        url: &str,
        ssl_verify: bool,
    ) -> Result<ScannerConfigRow> {
        let model = ScanEntity::find_by_id(id)
            .one(self.db())
            .await?
            .ok_or_else(|| StorageError::NotFound {
                entity: "scanner_config",
                id: id.to_string(),
            })?;
        let now = Utc::now().fixed_offset();
        let mut am: scanner_config::ActiveModel = model.into();
        am.name = Set(name.to_string());
        am.username = Set(username.to_string());
        am.password = Set(password.to_string());
        am.url = Set(url.to_string());
        am.ssl_verify = Set(ssl_verify);
        am.updated_at = Set(now);
        Ok(model_to_row(am.update(self.db()).await?))
    }

    pub async fn delete_scanner_config(&self, id: &str) -> Result<bool> {
        let res = ScanEntity::delete_by_id(id).exec(self.db()).await?;
        Ok(res.rows_affected > 0)
    }

    pub async fn count_scanner_configs(&self) -> Result<u64> {
        Ok(ScanEntity::find().count(self.db()).await?)
    }
}
