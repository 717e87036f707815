use anyhow::Result;
use auditmon_storage::{masked_identifier, AccountRow, FindingCount, RecentFinding, Store};
use chrono::Utc;

/// A rendered daily summary, ready to send.
pub struct DailySummary {
    pub subject: String,
    pub html: String,
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn finding_count_table(items: &[FindingCount], with_issue: bool) -> String {
    if items.is_empty() {
        return "<p class=\"empty\">Nothing to report.</p>".to_string();
    }
    let mut out = String::from("<table><tr><th>Technology</th>");
    if with_issue {
        out.push_str("<th>Issue</th>");
    }
    out.push_str("<th>Findings</th></tr>");
    for row in items {
        out.push_str("<tr><td>");
        out.push_str(&escape(&capitalize(&row.name)));
        out.push_str("</td>");
        if with_issue {
            out.push_str("<td>");
            out.push_str(&escape(&capitalize(&row.issue)));
            out.push_str("</td>");
        }
        out.push_str(&format!("<td>{}</td></tr>", row.total_findings));
    }
    out.push_str("</table>");
    out
}

fn recent_finding_table(items: &[RecentFinding], with_date: bool) -> String {
    if items.is_empty() {
        return "<p class=\"empty\">Nothing to report.</p>".to_string();
    }
    let mut out = String::from("<table><tr><th>Technology</th><th>Finding</th><th>Notes</th>");
    if with_date {
        out.push_str("<th>Justified</th>");
    }
    out.push_str("</tr>");
    for row in items {
        out.push_str("<tr><td>");
        out.push_str(&escape(&capitalize(&row.technology)));
        out.push_str("</td><td>");
        out.push_str(&escape(&row.finding));
        out.push_str("</td><td>");
        out.push_str(&escape(row.notes.as_deref().unwrap_or("")));
        out.push_str("</td>");
        if with_date {
            out.push_str("<td>");
            out.push_str(&escape(row.justified_date.as_deref().unwrap_or("")));
            out.push_str("</td>");
        }
        out.push_str("</tr>");
    }
    out.push_str("</table>");
    out
}

/// Build the HTML daily summary for one account over a day window.
pub async fn build_daily_summary(
    store: &Store,
    account: &AccountRow,
    days: i64,
) -> Result<DailySummary> {
    let top_findings = store.top_findings_by_account(&account.name, 5).await?;
    let top_technologies = store.top_technologies_by_account(&account.name, 5).await?;
    let recent = store.recent_findings(&account.name, days, 10).await?;
    let guardduty = store
        .recent_guardduty_findings(&account.name, days, 10)
        .await?;
    let justified = store
        .recent_justified_findings(&account.name, days, 10)
        .await?;

    let report_date = Utc::now().format("%a, %d %b %Y").to_string();
    let title = "auditmon daily summary report";

    let html = include_str!("templates/daily_summary.html")
        .replace("{{title}}", title)
        .replace("{{account_name}}", &escape(&account.name))
        .replace(
            "{{account_identifier}}",
            &masked_identifier(&account.identifier),
        )
        .replace("{{report_date}}", &report_date)
        .replace(
            "{{top_findings}}",
            &finding_count_table(&top_findings.items, true),
        )
        .replace(
            "{{top_technologies}}",
            &finding_count_table(&top_technologies.items, false),
        )
        .replace(
            "{{recent_findings}}",
            &recent_finding_table(&recent.items, false),
        )
        .replace(
            "{{recent_guardduty}}",
            &recent_finding_table(&guardduty.items, false),
        )
        .replace(
            "{{recent_justified}}",
            &recent_finding_table(&justified.items, true),
        );

    Ok(DailySummary {
        subject: format!("auditmon report for {report_date}"),
        html,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finding_count_table_escapes_and_capitalizes() {
        let rows = vec![FindingCount {
            name: "securitygroup".to_string(),
            issue: "open <ingress>".to_string(),
            total_findings: 3,
        }];
        let html = finding_count_table(&rows, true);
        assert!(html.contains("Securitygroup"));
        assert!(html.contains("Open &lt;ingress&gt;"));
        assert!(html.contains("<td>3</td>"));
    }

    #[test]
    fn test_empty_section_renders_placeholder() {
        assert!(finding_count_table(&[], false).contains("Nothing to report"));
        assert!(recent_finding_table(&[], true).contains("Nothing to report"));
    }
}
