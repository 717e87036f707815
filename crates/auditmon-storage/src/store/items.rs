use anyhow::Result;
use auditmon_common::id::next_id;
use auditmon_common::types::{ChangeItem, IssueDraft};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, Statement,
};
use serde::{Deserialize, Serialize};

use crate::entities::auditor_settings::{
    self, Column as SettingsCol, Entity as SettingsEntity,
};
use crate::entities::item::{self, Column as ItemCol, Entity as ItemEntity};
use crate::entities::item_audit::{self, Column as AuditCol, Entity as AuditEntity};
use crate::entities::item_revision::{self, Column as RevCol, Entity as RevEntity};
use crate::entities::technology::{self, Column as TechCol, Entity as TechEntity};
use crate::error::StorageError;
use crate::store::diff::configs_equal;
use crate::store::Store;

/// Outcome of persisting one slurped item through the diff policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredItem {
    pub item_id: String,
    pub revision_id: String,
    pub tech_id: String,
    pub account_id: String,
    /// True when a new revision was appended, false when only the
    /// ephemeral-change marker moved.
    pub changed: bool,
}

/// Everything the ticket bridge needs about one item's current finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketSource {
    pub technology: String,
    pub account_identifier: String,
    pub region: String,
    pub name: String,
    pub issue: String,
    pub notes: Option<String>,
    pub score: i32,
    pub action_instructions: Option<String>,
    /// Raw JSON of the item's current revision config.
    pub config: Option<String>,
}

impl Store {
    pub async fn find_or_create_technology(&self, name: &str) -> Result<technology::Model> {
        if let Some(existing) = TechEntity::find()
            .filter(TechCol::Name.eq(name))
            .one(self.db())
            .await?
        {
            return Ok(existing);
        }
        let now = Utc::now().fixed_offset();
        let am = technology::ActiveModel {
            id: Set(next_id()),
            name: Set(name.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(am.insert(self.db()).await?)
    }

    pub async fn get_or_create_auditor_settings(
        &self,
        tech_id: &str,
        account_id: &str,
        auditor_class: &str,
        issue_text: &str,
    ) -> Result<auditor_settings::Model> {
        if let Some(existing) = SettingsEntity::find()
            .filter(SettingsCol::TechId.eq(tech_id))
            .filter(SettingsCol::AccountId.eq(account_id))
            .filter(SettingsCol::AuditorClass.eq(auditor_class))
            .one(self.db())
            .await?
        {
            return Ok(existing);
        }
        let now = Utc::now().fixed_offset();
        let am = auditor_settings::ActiveModel {
            id: Set(next_id()),
            tech_id: Set(tech_id.to_string()),
            account_id: Set(account_id.to_string()),
            auditor_class: Set(auditor_class.to_string()),
            disabled: Set(false),
            issue_text: Set(Some(issue_text.to_string())),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(am.insert(self.db()).await?)
    }

    /// Persist one slurped item.
    ///
    /// Finds or creates the Technology and Item rows, then applies the
    /// diff policy against the current revision: structurally equal
    /// configs (ignoring `ephemeral_paths`) only move the
    /// ephemeral-change marker; anything else appends a new active
    /// revision and retires the previous one.
    pub async fn store_change_item(
        &self,
        change: &ChangeItem,
        ephemeral_paths: &[&str],
    ) -> Result<StoredItem> {
        let account = self
            .get_account_by_name(&change.account)
            .await?
            .ok_or_else(|| StorageError::NotFound {
                entity: "account",
                id: change.account.clone(),
            })?;
        let tech = self.find_or_create_technology(&change.index).await?;
        let now = Utc::now().fixed_offset();

        let existing = ItemEntity::find()
            .filter(ItemCol::TechId.eq(tech.id.clone()))
            .filter(ItemCol::AccountId.eq(account.id.clone()))
            .filter(ItemCol::Region.eq(change.region.clone()))
            .filter(ItemCol::Name.eq(change.name.clone()))
            .one(self.db())
            .await?;

        let item_model = match existing {
            Some(m) => m,
            None => {
                let am = item::ActiveModel {
                    id: Set(next_id()),
                    tech_id: Set(tech.id.clone()),
                    account_id: Set(account.id.clone()),
                    region: Set(change.region.clone()),
                    name: Set(change.name.clone()),
                    arn: Set(change.arn.clone()),
                    latest_revision_id: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                am.insert(self.db()).await?
            }
        };

        let new_config = change.config.to_json();
        let current = RevEntity::find()
            .filter(RevCol::ItemId.eq(item_model.id.clone()))
            .filter(RevCol::Active.eq(true))
            .order_by(RevCol::DateCreated, Order::Desc)
            .one(self.db())
            .await?;

        if let Some(current) = current {
            let stored: serde_json::Value =
                serde_json::from_str(&current.config).unwrap_or(serde_json::Value::Null);
            if configs_equal(&stored, &new_config, ephemeral_paths) {
                let revision_id = current.id.clone();
                let mut am: item_revision::ActiveModel = current.into();
                am.date_last_ephemeral_change = Set(Some(now));
                am.update(self.db()).await?;
                return Ok(StoredItem {
                    item_id: item_model.id,
                    revision_id,
                    tech_id: tech.id,
                    account_id: account.id,
                    changed: false,
                });
            }
            let mut am: item_revision::ActiveModel = current.into();
            am.active = Set(false);
            am.update(self.db()).await?;
        }

        let revision_id = next_id();
        let rev = item_revision::ActiveModel {
            id: Set(revision_id.clone()),
            item_id: Set(item_model.id.clone()),
            config: Set(serde_json::to_string(&new_config)?),
            active: Set(true),
            date_created: Set(now),
            date_last_ephemeral_change: Set(None),
        };
        rev.insert(self.db()).await?;

        let item_id = item_model.id.clone();
        let mut item_am: item::ActiveModel = item_model.into();
        item_am.latest_revision_id = Set(Some(revision_id.clone()));
        item_am.updated_at = Set(now);
        item_am.update(self.db()).await?;

        Ok(StoredItem {
            item_id,
            revision_id,
            tech_id: tech.id,
            account_id: account.id,
            changed: true,
        })
    }

    /// Reconcile the issues raised by the current audit pass against the
    /// item's open findings.
    ///
    /// Open issues not re-raised are marked `fixed`; re-raised issues
    /// keep their row (and any justification); new drafts are inserted
    /// linked to the raising auditor's settings row. Returns
    /// `(inserted, fixed)` counts.
    pub async fn reconcile_issues(
        &self,
        item_id: &str,
        tech_id: &str,
        account_id: &str,
        drafts: &[IssueDraft],
    ) -> Result<(usize, usize)> {
        let now = Utc::now().fixed_offset();
        let open = AuditEntity::find()
            .filter(AuditCol::ItemId.eq(item_id))
            .filter(AuditCol::Fixed.eq(false))
            .all(self.db())
            .await?;

        let matches = |audit: &item_audit::Model, draft: &IssueDraft| {
            audit.issue == draft.issue && audit.notes == draft.notes
        };

        let mut fixed = 0usize;
        for existing in &open {
            if !drafts.iter().any(|d| matches(existing, d)) {
                let mut am: item_audit::ActiveModel = existing.clone().into();
                am.fixed = Set(true);
                am.updated_at = Set(now);
                am.update(self.db()).await?;
                fixed += 1;
            }
        }

        let mut inserted = 0usize;
        for draft in drafts {
            if open.iter().any(|a| matches(a, draft)) {
                continue;
            }
            let auditor_class = draft.auditor_class.as_deref().unwrap_or("Auditor");
            let settings = self
                .get_or_create_auditor_settings(tech_id, account_id, auditor_class, auditor_class)
                .await?;
            let am = item_audit::ActiveModel {
                id: Set(next_id()),
                item_id: Set(item_id.to_string()),
                auditor_setting_id: Set(Some(settings.id)),
                score: Set(draft.score),
                issue: Set(draft.issue.clone()),
                notes: Set(draft.notes.clone()),
                action_instructions: Set(draft.action_instructions.clone()),
                justified: Set(false),
                justification: Set(None),
                justified_date: Set(None),
                fixed: Set(false),
                created_at: Set(now),
                updated_at: Set(now),
            };
            am.insert(self.db()).await?;
            inserted += 1;
        }

        Ok((inserted, fixed))
    }

    /// Mark one finding as accepted risk. Only ever triggered by explicit
    /// user action.
    pub async fn justify_issue(&self, audit_id: &str, justification: &str) -> Result<()> {
        let audit = AuditEntity::find_by_id(audit_id)
            .one(self.db())
            .await?
            .ok_or_else(|| StorageError::NotFound {
                entity: "item_audit",
                id: audit_id.to_string(),
            })?;
        let now = Utc::now().fixed_offset();
        let mut am: item_audit::ActiveModel = audit.into();
        am.justified = Set(true);
        am.justification = Set(Some(justification.to_string()));
        am.justified_date = Set(Some(now));
        am.updated_at = Set(now);
        am.update(self.db()).await?;
        Ok(())
    }

    /// Current finding of one item, joined with the fields the ticket
    /// bridge sends out. Highest-scored audit row wins.
    pub async fn ticket_source(&self, item_id: &str) -> Result<Option<TicketSource>> {
        let sql = "SELECT t.name AS technology, a.identifier AS account_identifier, \
                   i.region AS region, i.name AS name, ia.issue AS issue, ia.notes AS notes, \
                   ia.score AS score, ia.action_instructions AS action_instructions, \
                   ir.config AS config \
                   FROM items i \
                   JOIN accounts a ON a.id = i.account_id \
                   JOIN technologies t ON t.id = i.tech_id \
                   JOIN item_audits ia ON ia.item_id = i.id \
                   LEFT JOIN item_revisions ir ON ir.id = i.latest_revision_id \
                   WHERE i.id = ? \
                   ORDER BY ia.score DESC \
                   LIMIT 1";
        let row = self
            .db()
            .query_one(Statement::from_sql_and_values(
                self.db().get_database_backend(),
                sql,
                [item_id.into()],
            ))
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(TicketSource {
            technology: row.try_get("", "technology")?,
            account_identifier: row.try_get("", "account_identifier")?,
            region: row.try_get("", "region")?,
            name: row.try_get("", "name")?,
            issue: row.try_get("", "issue")?,
            notes: row.try_get("", "notes")?,
            score: row.try_get::<i32>("", "score")?,
            action_instructions: row.try_get("", "action_instructions")?,
            config: row.try_get("", "config")?,
        }))
    }

    // ---- row counts (health endpoint and tests) ----

    pub async fn count_items(&self) -> Result<u64> {
        Ok(ItemEntity::find().count(self.db()).await?)
    }

    pub async fn count_revisions(&self) -> Result<u64> {
        Ok(RevEntity::find().count(self.db()).await?)
    }

    pub async fn count_item_audits(&self) -> Result<u64> {
        Ok(AuditEntity::find().count(self.db()).await?)
    }

    pub async fn count_auditor_settings(&self) -> Result<u64> {
        Ok(SettingsEntity::find().count(self.db()).await?)
    }

    /// Revisions of one item, newest first (drill-down history).
    pub async fn list_revisions(
        &self,
        item_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<item_revision::Model>> {
        use sea_orm::QuerySelect;
        Ok(RevEntity::find()
            .filter(RevCol::ItemId.eq(item_id))
            .order_by(RevCol::DateCreated, Order::Desc)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(self.db())
            .await?)
    }
}
