use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use serde::{Deserialize, Serialize};

use crate::entities::account::{self, Column as AcctCol, Entity as AcctEntity};
use crate::store::Store;

/// One monitored cloud account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRow {
    pub id: String,
    /// Unique human label (referenced by every item).
    pub name: String,
    /// Provider account id, e.g. a 12-digit AWS id.
    pub identifier: String,
    pub active: bool,
    pub third_party: bool,
    pub notify_emails: Vec<String>,
    /// Resource-name glob patterns skipped by watchers.
    pub ignore_list: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn model_to_account(m: account::Model) -> AccountRow {
    let notify_emails: Vec<String> = serde_json::from_str(&m.notify_emails).unwrap_or_default();
    let ignore_list: Vec<String> = serde_json::from_str(&m.ignore_list).unwrap_or_default();
    AccountRow {
        id: m.id,
        name: m.name,
        identifier: m.identifier,
        active: m.active,
        third_party: m.third_party,
        notify_emails,
        ignore_list,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl Store {
    pub async fn insert_account(&self, row: &AccountRow) -> Result<AccountRow> {
        let now = Utc::now().fixed_offset();
        let am = account::ActiveModel {
            id: Set(row.id.clone()),
            name: Set(row.name.clone()),
            identifier: Set(row.identifier.clone()),
            active: Set(row.active),
            third_party: Set(row.third_party),
            notify_emails: Set(serde_json::to_string(&row.notify_emails)?),
            ignore_list: Set(serde_json::to_string(&row.ignore_list)?),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(model_to_account(model))
    }

    pub async fn get_account_by_name(&self, name: &str) -> Result<Option<AccountRow>> {
        let model = AcctEntity::find()
            .filter(AcctCol::Name.eq(name))
            .one(self.db())
            .await?;
        Ok(model.map(model_to_account))
    }

    pub async fn get_account_by_identifier(&self, identifier: &str) -> Result<Option<AccountRow>> {
        let model = AcctEntity::find()
            .filter(AcctCol::Identifier.eq(identifier))
            .one(self.db())
            .await?;
        Ok(model.map(model_to_account))
    }

    pub async fn list_accounts(&self, active_only: bool) -> Result<Vec<AccountRow>> {
        let mut q = AcctEntity::find();
        if active_only {
            q = q.filter(AcctCol::Active.eq(true));
        }
        let rows = q.order_by_asc(AcctCol::Name).all(self.db()).await?;
        Ok(rows.into_iter().map(model_to_account).collect())
    }

    pub async fn count_accounts(&self) -> Result<u64> {
        Ok(AcctEntity::find().count(self.db()).await?)
    }
}
