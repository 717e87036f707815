use anyhow::Result;
use auditmon_common::config::tech;
use auditmon_common::config::ResourceConfig;
use auditmon_common::id::next_id;
use auditmon_common::types::ChangeItem;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectionTrait, EntityTrait, PaginatorTrait, Statement, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::entities::guardduty_event;
use crate::entities::item_audit;
use crate::error::StorageError;
use crate::store::Store;

/// Result of ingesting one pushed GuardDuty event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub event_id: String,
    pub item_id: String,
    pub audit_id: String,
}

/// One aggregated port-probe location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbePoint {
    pub lat: f64,
    pub lon: f64,
    pub count: u64,
    #[serde(rename = "cityName")]
    pub city_name: Option<String>,
    #[serde(rename = "countryName")]
    pub country_name: Option<String>,
    #[serde(rename = "remoteIpV4")]
    pub remote_ip_v4: Option<String>,
    #[serde(rename = "remoteOrg")]
    pub remote_org: Option<String>,
    #[serde(rename = "remoteOrgASN")]
    pub remote_org_asn: Option<i64>,
    #[serde(rename = "remoteOrgASNOrg")]
    pub remote_org_asn_org: Option<String>,
    #[serde(rename = "remoteOrgISP")]
    pub remote_org_isp: Option<String>,
    #[serde(rename = "localPort")]
    pub local_port: Option<i64>,
    #[serde(rename = "localPortName")]
    pub local_port_name: Option<String>,
}

/// Probe event count for one country.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryCount {
    #[serde(rename = "countryName")]
    pub country_name: String,
    pub count: u64,
}

fn str_at<'a>(v: &'a serde_json::Value, path: &[&str]) -> Option<&'a str> {
    let mut cur = v;
    for p in path {
        cur = cur.get(p)?;
    }
    cur.as_str()
}

fn f64_at(v: &serde_json::Value, path: &[&str]) -> Option<f64> {
    let mut cur = v;
    for p in path {
        cur = cur.get(p)?;
    }
    cur.as_f64()
}

fn i64_at(v: &serde_json::Value, path: &[&str]) -> Option<i64> {
    let mut cur = v;
    for p in path {
        cur = cur.get(p)?;
    }
    cur.as_i64()
}

impl Store {
    /// Ingest one pushed GuardDuty event.
    ///
    /// Resolves the account by the event's top-level `account` identifier
    /// (falling back to `detail.accountId`), stores the item + revision
    /// through the diff policy, lazily creates the GuardDuty auditor
    /// settings, records the scored finding, and keeps the raw payload in
    /// its own row for drill-down and geo aggregation.
    pub async fn ingest_guardduty_event(&self, event: &serde_json::Value) -> Result<IngestOutcome> {
        let detail = event.get("detail").cloned().unwrap_or_default();

        let identifier = event
            .get("account")
            .and_then(|v| v.as_str())
            .or_else(|| detail.get("accountId").and_then(|v| v.as_str()))
            .ok_or_else(|| StorageError::Other("event carries no account identifier".into()))?;
        let account = self
            .get_account_by_identifier(identifier)
            .await?
            .ok_or_else(|| StorageError::NotFound {
                entity: "account",
                id: identifier.to_string(),
            })?;

        let region = event
            .get("region")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        let name = detail
            .get("type")
            .and_then(|v| v.as_str())
            .unwrap_or("guardduty-finding");
        let severity = detail
            .get("severity")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0) as i32;
        let title = detail
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or(name)
            .to_string();
        let description = detail
            .get("description")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        let change = ChangeItem::new(
            &account.name,
            region,
            name,
            None,
            ResourceConfig::GuardDuty(event.clone()),
        );
        let stored = self.store_change_item(&change, &[]).await?;

        let tech = self.find_or_create_technology(tech::GUARD_DUTY).await?;
        let settings = self
            .get_or_create_auditor_settings(&tech.id, &account.id, "GuardDuty", "Guard Duty")
            .await?;

        let now = Utc::now().fixed_offset();
        let audit_id = next_id();
        let audit = item_audit::ActiveModel {
            id: Set(audit_id.clone()),
            item_id: Set(stored.item_id.clone()),
            auditor_setting_id: Set(Some(settings.id)),
            score: Set(severity),
            issue: Set(title),
            notes: Set(description),
            action_instructions: Set(None),
            justified: Set(false),
            justification: Set(None),
            justified_date: Set(None),
            fixed: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };
        audit.insert(self.db()).await?;

        let event_id = next_id();
        let row = guardduty_event::ActiveModel {
            id: Set(event_id.clone()),
            item_id: Set(stored.item_id.clone()),
            config: Set(serde_json::to_string(event)?),
            date_created: Set(now),
        };
        row.insert(self.db()).await?;

        Ok(IngestOutcome {
            event_id,
            item_id: stored.item_id,
            audit_id,
        })
    }

    pub async fn count_guardduty_events(&self) -> Result<u64> {
        Ok(guardduty_event::Entity::find().count(self.db()).await?)
    }

    /// Raw port-probe details from stored events whose item still carries
    /// an open finding, optionally restricted by account names.
    async fn probe_details(&self, accounts: Option<&[String]>) -> Result<Vec<serde_json::Value>> {
        let mut sql = String::from(
            "SELECT DISTINCT g.id AS id, g.config AS config \
             FROM guardduty_events g \
             JOIN items i ON i.id = g.item_id \
             JOIN item_audits ia ON ia.item_id = i.id \
             JOIN accounts a ON a.id = i.account_id \
             WHERE ia.justified = 0 AND ia.fixed = 0",
        );
        let mut values: Vec<Value> = Vec::new();
        if let Some(names) = accounts {
            let placeholders = std::iter::repeat("?")
                .take(names.len())
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" AND a.name IN ({placeholders})"));
            values.extend(names.iter().map(|n| Value::from(n.clone())));
        }
        let rows = self
            .db()
            .query_all(Statement::from_sql_and_values(
                self.db().get_database_backend(),
                sql,
                values,
            ))
            .await?;

        let mut details = Vec::new();
        for row in rows {
            let config: String = row.try_get("", "config")?;
            let Ok(event) = serde_json::from_str::<serde_json::Value>(&config) else {
                continue;
            };
            if let Some(probes) = event
                .pointer("/detail/service/action/portProbeAction/portProbeDetails")
                .and_then(|v| v.as_array())
            {
                details.extend(probes.iter().cloned());
            }
        }
        Ok(details)
    }

    /// Port-probe geo points grouped by (lat, lon) with counts, for the
    /// world-map chart.
    pub async fn guardduty_map_points(
        &self,
        accounts: Option<&[String]>,
    ) -> Result<Vec<ProbePoint>> {
        let details = self.probe_details(accounts).await?;
        let mut grouped: HashMap<String, ProbePoint> = HashMap::new();
        for probe in details {
            let (Some(lat), Some(lon)) = (
                f64_at(&probe, &["remoteIpDetails", "geoLocation", "lat"]),
                f64_at(&probe, &["remoteIpDetails", "geoLocation", "lon"]),
            ) else {
                continue;
            };
            let key = format!("{lat}|{lon}");
            let entry = grouped.entry(key).or_insert_with(|| ProbePoint {
                lat,
                lon,
                count: 0,
                city_name: str_at(&probe, &["remoteIpDetails", "city", "cityName"])
                    .map(String::from),
                country_name: str_at(&probe, &["remoteIpDetails", "country", "countryName"])
                    .map(String::from),
                remote_ip_v4: str_at(&probe, &["remoteIpDetails", "ipAddressV4"])
                    .map(String::from),
                remote_org: str_at(&probe, &["remoteIpDetails", "organization", "org"])
                    .map(String::from),
                remote_org_asn: i64_at(&probe, &["remoteIpDetails", "organization", "asn"]),
                remote_org_asn_org: str_at(&probe, &["remoteIpDetails", "organization", "asnOrg"])
                    .map(String::from),
                remote_org_isp: str_at(&probe, &["remoteIpDetails", "organization", "isp"])
                    .map(String::from),
                local_port: i64_at(&probe, &["localPortDetails", "port"]),
                local_port_name: str_at(&probe, &["localPortDetails", "portName"])
                    .map(String::from),
            });
            entry.count += 1;
        }
        let mut points: Vec<ProbePoint> = grouped.into_values().collect();
        points.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(points)
    }

    /// Top countries by probe event count, for the bar chart.
    pub async fn guardduty_top_countries(
        &self,
        accounts: Option<&[String]>,
        limit: usize,
    ) -> Result<Vec<CountryCount>> {
        let details = self.probe_details(accounts).await?;
        let mut grouped: HashMap<String, u64> = HashMap::new();
        for probe in details {
            let Some(country) = str_at(&probe, &["remoteIpDetails", "country", "countryName"])
            else {
                continue;
            };
            *grouped.entry(country.to_string()).or_insert(0) += 1;
        }
        let mut counts: Vec<CountryCount> = grouped
            .into_iter()
            .map(|(country_name, count)| CountryCount {
                country_name,
                count,
            })
            .collect();
        counts.sort_by(|a, b| b.count.cmp(&a.count).then(a.country_name.cmp(&b.country_name)));
        counts.truncate(limit);
        Ok(counts)
    }
}
