use anyhow::Result;
use auditmon_common::types::Severity;
use chrono::{Duration, Utc};
use sea_orm::{ConnectionTrait, Statement, Value};
use serde::{Deserialize, Serialize};

use crate::store::Store;

/// Envelope shared by every reporting aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection<T> {
    pub items: Vec<T>,
    pub count: usize,
}

impl<T> ReportSection<T> {
    pub fn new(items: Vec<T>) -> Self {
        let count = items.len();
        Self { items, count }
    }
}

/// (technology, issue) pair with its open finding count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingCount {
    pub name: String,
    pub issue: String,
    pub total_findings: i64,
}

/// Open finding count per technology, with percentage share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechCount {
    pub technology: String,
    pub count: i64,
    pub percentage: f64,
}

/// Open finding counts bucketed by the canonical severity banding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeverityBuckets {
    pub low: i64,
    pub medium: i64,
    pub high: i64,
}

/// Revision count for one calendar month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthCount {
    #[serde(rename = "Month")]
    pub month: String,
    #[serde(rename = "Count")]
    pub count: i64,
}

/// One open finding rendered as a POA&M row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoamRow {
    pub poam_id: String,
    pub control: String,
    pub weakness_name: String,
    pub weakness_description: String,
    pub score: i32,
    pub poam_comments: Option<String>,
    pub create_date: String,
}

/// One finding in the recent/justified report sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentFinding {
    pub technology: String,
    pub finding: String,
    pub notes: Option<String>,
    pub justified_date: Option<String>,
}

/// Score above which a finding appears in the daily summary report.
pub const REPORTABLE_SCORE: i32 = 7;

/// Looser score threshold used only by the GuardDuty report feed.
pub const GUARDDUTY_REPORT_SCORE: i32 = 4;

/// Note marker for egress-rule noise excluded from every report.
const EGRESS_NOISE: &str = "%[egress:%";

fn in_placeholders(n: usize) -> String {
    std::iter::repeat("?")
        .take(n)
        .collect::<Vec<_>>()
        .join(", ")
}

fn month_label(key: &str) -> String {
    // key is "YYYY-MM"
    match key.get(5..7) {
        Some("01") => "Jan",
        Some("02") => "Feb",
        Some("03") => "Mar",
        Some("04") => "Apr",
        Some("05") => "May",
        Some("06") => "Jun",
        Some("07") => "Jul",
        Some("08") => "Aug",
        Some("09") => "Sep",
        Some("10") => "Oct",
        Some("11") => "Nov",
        Some("12") => "Dec",
        _ => return key.to_string(),
    }
    .to_string()
}

impl Store {
    async fn query_rows(&self, sql: String, values: Vec<Value>) -> Result<Vec<sea_orm::QueryResult>> {
        Ok(self
            .db()
            .query_all(Statement::from_sql_and_values(
                self.db().get_database_backend(),
                sql,
                values,
            ))
            .await?)
    }

    /// Top open (technology, issue) pairs by count for one account.
    /// Only reportable-severity findings count; egress noise is excluded.
    pub async fn top_findings_by_account(
        &self,
        account: &str,
        limit: usize,
    ) -> Result<ReportSection<FindingCount>> {
        let sql = format!(
            "SELECT DISTINCT t.name AS name, ia.issue AS issue, COUNT(1) AS total_findings \
             FROM items i \
             JOIN item_audits ia ON i.id = ia.item_id \
             JOIN technologies t ON i.tech_id = t.id \
             JOIN accounts a ON i.account_id = a.id \
             WHERE a.name = ? \
             AND ia.justified = 0 AND ia.fixed = 0 \
             AND COALESCE(ia.notes, '') NOT LIKE '{EGRESS_NOISE}' \
             AND ia.score > ? \
             GROUP BY t.name, ia.issue \
             ORDER BY COUNT(1) DESC \
             LIMIT ?"
        );
        let rows = self
            .query_rows(
                sql,
                vec![
                    account.into(),
                    REPORTABLE_SCORE.into(),
                    (limit as i64).into(),
                ],
            )
            .await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(FindingCount {
                name: row.try_get("", "name")?,
                issue: row.try_get("", "issue")?,
                total_findings: row.try_get("", "total_findings")?,
            });
        }
        Ok(ReportSection::new(items))
    }

    /// Top technologies by open reportable finding count for one account.
    pub async fn top_technologies_by_account(
        &self,
        account: &str,
        limit: usize,
    ) -> Result<ReportSection<FindingCount>> {
        let sql = format!(
            "SELECT DISTINCT t.name AS name, COUNT(1) AS total_findings \
             FROM items i \
             JOIN item_audits ia ON i.id = ia.item_id \
             JOIN technologies t ON i.tech_id = t.id \
             JOIN accounts a ON i.account_id = a.id \
             WHERE a.name = ? \
             AND ia.justified = 0 AND ia.fixed = 0 \
             AND COALESCE(ia.notes, '') NOT LIKE '{EGRESS_NOISE}' \
             AND ia.score > ? \
             GROUP BY t.name \
             ORDER BY COUNT(1) DESC \
             LIMIT ?"
        );
        let rows = self
            .query_rows(
                sql,
                vec![
                    account.into(),
                    REPORTABLE_SCORE.into(),
                    (limit as i64).into(),
                ],
            )
            .await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(FindingCount {
                name: row.try_get("", "name")?,
                issue: String::new(),
                total_findings: row.try_get("", "total_findings")?,
            });
        }
        Ok(ReportSection::new(items))
    }

    /// Most recent reportable findings for one account: open findings
    /// whose item gained a revision within the day window, worst first.
    pub async fn recent_findings(
        &self,
        account: &str,
        days: i64,
        limit: usize,
    ) -> Result<ReportSection<RecentFinding>> {
        let cutoff = (Utc::now() - Duration::days(days)).fixed_offset();
        let sql = format!(
            "SELECT DISTINCT t.name AS technology, ia.issue AS finding, ia.notes AS notes \
             FROM items i \
             JOIN item_audits ia ON i.id = ia.item_id \
             JOIN technologies t ON i.tech_id = t.id \
             JOIN item_revisions ir ON i.id = ir.item_id \
             JOIN accounts a ON i.account_id = a.id \
             WHERE a.name = ? \
             AND ia.justified = 0 AND ia.fixed = 0 \
             AND COALESCE(ia.notes, '') NOT LIKE '{EGRESS_NOISE}' \
             AND ia.score > ? \
             AND datetime(ir.date_created) >= datetime(?) \
             ORDER BY ia.score DESC \
             LIMIT ?"
        );
        let rows = self
            .query_rows(
                sql,
                vec![
                    account.into(),
                    REPORTABLE_SCORE.into(),
                    cutoff.to_rfc3339().into(),
                    (limit as i64).into(),
                ],
            )
            .await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(RecentFinding {
                technology: row.try_get("", "technology")?,
                finding: row.try_get("", "finding")?,
                notes: row.try_get("", "notes")?,
                justified_date: None,
            });
        }
        Ok(ReportSection::new(items))
    }

    /// Recent GuardDuty findings for one account. The GuardDuty feed
    /// uses its own looser threshold (`score > 4`) instead of the
    /// reportable one.
    pub async fn recent_guardduty_findings(
        &self,
        account: &str,
        days: i64,
        limit: usize,
    ) -> Result<ReportSection<RecentFinding>> {
        let cutoff = (Utc::now() - Duration::days(days)).fixed_offset();
        let sql = "SELECT DISTINCT t.name AS technology, ia.issue AS finding, ia.notes AS notes \
             FROM items i \
             JOIN item_audits ia ON i.id = ia.item_id \
             JOIN technologies t ON i.tech_id = t.id \
             JOIN accounts a ON i.account_id = a.id \
             WHERE a.name = ? \
             AND t.name = 'guardduty' \
             AND ia.justified = 0 AND ia.fixed = 0 \
             AND ia.score > ? \
             AND datetime(ia.created_at) >= datetime(?) \
             ORDER BY ia.score DESC \
             LIMIT ?";
        let rows = self
            .query_rows(
                sql.to_string(),
                vec![
                    account.into(),
                    GUARDDUTY_REPORT_SCORE.into(),
                    cutoff.to_rfc3339().into(),
                    (limit as i64).into(),
                ],
            )
            .await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(RecentFinding {
                technology: row.try_get("", "technology")?,
                finding: row.try_get("", "finding")?,
                notes: row.try_get("", "notes")?,
                justified_date: None,
            });
        }
        Ok(ReportSection::new(items))
    }

    /// Recently justified or fixed findings for one account: the union of
    /// justified-within-window and fixed-with-recent-ephemeral-change.
    pub async fn recent_justified_findings(
        &self,
        account: &str,
        days: i64,
        limit: usize,
    ) -> Result<ReportSection<RecentFinding>> {
        let cutoff = (Utc::now() - Duration::days(days))
            .fixed_offset()
            .to_rfc3339();
        let sql = format!(
            "SELECT DISTINCT t.name AS technology, ia.issue AS finding, ia.notes AS notes, \
                    ia.justified_date AS justified_date \
             FROM items i \
             JOIN item_audits ia ON i.id = ia.item_id \
             JOIN technologies t ON i.tech_id = t.id \
             JOIN accounts a ON i.account_id = a.id \
             WHERE a.name = ? \
             AND ia.justified = 1 \
             AND COALESCE(ia.notes, '') NOT LIKE '{EGRESS_NOISE}' \
             AND datetime(ia.justified_date) >= datetime(?) \
             UNION \
             SELECT DISTINCT t.name AS technology, ia.issue AS finding, ia.notes AS notes, \
                    ia.justified_date AS justified_date \
             FROM items i \
             JOIN item_audits ia ON i.id = ia.item_id \
             JOIN technologies t ON i.tech_id = t.id \
             JOIN item_revisions ir ON i.id = ir.item_id \
             JOIN accounts a ON i.account_id = a.id \
             WHERE a.name = ? \
             AND ia.fixed = 1 \
             AND COALESCE(ia.notes, '') NOT LIKE '{EGRESS_NOISE}' \
             AND datetime(ir.date_last_ephemeral_change) >= datetime(?) \
             LIMIT ?"
        );
        let rows = self
            .query_rows(
                sql,
                vec![
                    account.into(),
                    cutoff.clone().into(),
                    account.into(),
                    cutoff.into(),
                    (limit as i64).into(),
                ],
            )
            .await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(RecentFinding {
                technology: row.try_get("", "technology")?,
                finding: row.try_get("", "finding")?,
                notes: row.try_get("", "notes")?,
                justified_date: row.try_get("", "justified_date")?,
            });
        }
        Ok(ReportSection::new(items))
    }

    /// Open finding count per technology, with percentage share of the
    /// total, optionally restricted to a set of account names.
    pub async fn vulnerabilities_by_tech(
        &self,
        accounts: Option<&[String]>,
    ) -> Result<Vec<TechCount>> {
        let mut sql = String::from(
            "SELECT t.name AS technology, COUNT(1) AS count \
             FROM technologies t \
             JOIN items i ON i.tech_id = t.id \
             JOIN item_audits ia ON ia.item_id = i.id \
             JOIN accounts a ON a.id = i.account_id \
             WHERE ia.justified = 0 AND ia.fixed = 0",
        );
        let mut values: Vec<Value> = Vec::new();
        if let Some(names) = accounts {
            sql.push_str(&format!(
                " AND a.name IN ({})",
                in_placeholders(names.len())
            ));
            values.extend(names.iter().map(|n| Value::from(n.clone())));
        }
        sql.push_str(" GROUP BY t.name ORDER BY t.name");

        let rows = self.query_rows(sql, values).await?;
        let mut counts = Vec::with_capacity(rows.len());
        for row in rows {
            let technology: String = row.try_get("", "technology")?;
            let count: i64 = row.try_get("", "count")?;
            counts.push((technology, count));
        }
        let total: i64 = counts.iter().map(|(_, c)| c).sum();
        Ok(counts
            .into_iter()
            .map(|(technology, count)| TechCount {
                technology,
                count,
                percentage: if total > 0 {
                    (count as f64 * 10000.0 / total as f64).round() / 100.0
                } else {
                    0.0
                },
            })
            .collect())
    }

    /// Open finding counts bucketed Low/Medium/High.
    pub async fn vulnerabilities_by_severity(
        &self,
        accounts: Option<&[String]>,
    ) -> Result<SeverityBuckets> {
        let mut sql = String::from(
            "SELECT \
             SUM(CASE WHEN ia.score < 5 THEN 1 ELSE 0 END) AS low, \
             SUM(CASE WHEN ia.score >= 5 AND ia.score <= 10 THEN 1 ELSE 0 END) AS medium, \
             SUM(CASE WHEN ia.score > 10 THEN 1 ELSE 0 END) AS high \
             FROM item_audits ia \
             JOIN items i ON ia.item_id = i.id \
             JOIN accounts a ON a.id = i.account_id \
             WHERE ia.justified = 0 AND ia.fixed = 0",
        );
        let mut values: Vec<Value> = Vec::new();
        if let Some(names) = accounts {
            sql.push_str(&format!(
                " AND a.name IN ({})",
                in_placeholders(names.len())
            ));
            values.extend(names.iter().map(|n| Value::from(n.clone())));
        }
        let rows = self.query_rows(sql, values).await?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(SeverityBuckets::default());
        };
        Ok(SeverityBuckets {
            low: row.try_get::<Option<i64>>("", "low")?.unwrap_or(0),
            medium: row.try_get::<Option<i64>>("", "medium")?.unwrap_or(0),
            high: row.try_get::<Option<i64>>("", "high")?.unwrap_or(0),
        })
    }

    /// Revision counts bucketed by month, over items that carry findings,
    /// optionally filtered by severity band, technology list, and
    /// account names.
    pub async fn issues_count_by_month(
        &self,
        accounts: Option<&[String]>,
        severity: Option<&str>,
        technologies: Option<&[String]>,
    ) -> Result<Vec<MonthCount>> {
        let mut sql = String::from(
            "SELECT strftime('%Y-%m', ir.date_created) AS month, COUNT(ir.id) AS count \
             FROM item_revisions ir \
             JOIN items i ON ir.item_id = i.id \
             JOIN item_audits ia ON ia.item_id = i.id \
             JOIN technologies t ON t.id = i.tech_id \
             JOIN accounts a ON a.id = i.account_id \
             WHERE 1 = 1",
        );
        let mut values: Vec<Value> = Vec::new();
        if let Some(names) = accounts {
            sql.push_str(&format!(
                " AND a.name IN ({})",
                in_placeholders(names.len())
            ));
            values.extend(names.iter().map(|n| Value::from(n.clone())));
        }
        match severity.and_then(|s| s.parse::<Severity>().ok()) {
            Some(Severity::Low) => sql.push_str(" AND ia.score < 5"),
            Some(Severity::Medium) => sql.push_str(" AND ia.score >= 5 AND ia.score <= 10"),
            Some(Severity::High) => sql.push_str(" AND ia.score > 10"),
            None => {}
        }
        if let Some(techs) = technologies {
            sql.push_str(&format!(
                " AND t.name IN ({})",
                in_placeholders(techs.len())
            ));
            values.extend(techs.iter().map(|n| Value::from(n.clone())));
        }
        sql.push_str(" GROUP BY month ORDER BY month");

        let rows = self.query_rows(sql, values).await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let key: String = row.try_get("", "month")?;
            items.push(MonthCount {
                month: month_label(&key),
                count: row.try_get("", "count")?,
            });
        }
        Ok(items)
    }

    /// Open findings rendered as POA&M rows, worst first.
    pub async fn poam_items(
        &self,
        accounts: Option<&[String]>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PoamRow>> {
        let mut sql = String::from(
            "SELECT 'sa_poam-' || ia.id AS poam_id, t.name AS control, \
             ia.issue AS weakness_name, \
             COALESCE(ia.notes, '') || ',' || i.region || ',' || i.name AS weakness_description, \
             ia.score AS score, ia.action_instructions AS poam_comments, \
             ia.created_at AS create_date \
             FROM item_audits ia \
             JOIN items i ON ia.item_id = i.id \
             JOIN technologies t ON t.id = i.tech_id \
             JOIN accounts a ON a.id = i.account_id \
             WHERE ia.justified = 0 AND ia.fixed = 0",
        );
        let mut values: Vec<Value> = Vec::new();
        if let Some(names) = accounts {
            sql.push_str(&format!(
                " AND a.name IN ({})",
                in_placeholders(names.len())
            ));
            values.extend(names.iter().map(|n| Value::from(n.clone())));
        }
        sql.push_str(" ORDER BY ia.score DESC, ia.created_at DESC LIMIT ? OFFSET ?");
        values.push((limit as i64).into());
        values.push((offset as i64).into());

        let rows = self.query_rows(sql, values).await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(PoamRow {
                poam_id: row.try_get("", "poam_id")?,
                control: row.try_get("", "control")?,
                weakness_name: row.try_get("", "weakness_name")?,
                weakness_description: row.try_get("", "weakness_description")?,
                score: row.try_get::<i32>("", "score")?,
                poam_comments: row.try_get("", "poam_comments")?,
                create_date: row.try_get("", "create_date")?,
            });
        }
        Ok(items)
    }
}

/// Mask a provider account identifier for outbound reports, keeping the
/// last four characters.
pub fn masked_identifier(identifier: &str) -> String {
    let tail: String = identifier
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("XXXXXXXX{tail}")
}
