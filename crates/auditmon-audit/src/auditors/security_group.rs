use crate::{AuditContext, AuditError, Auditor, Check};
use auditmon_common::config::{tech, ResourceConfig, SecurityGroupRule};
use auditmon_common::types::ChangeItem;

pub struct SecurityGroupAuditor;

/// Port range of one rule, widened to all ports when the protocol is
/// `-1` (all protocols).
fn port_range(rule: &SecurityGroupRule) -> Option<(i64, i64)> {
    if rule.ip_protocol == "-1" {
        return Some((0, 65535));
    }
    match (rule.from_port, rule.to_port) {
        (Some(from), Some(to)) => Some((from, to)),
        _ => None,
    }
}

fn port_phrase(rule: &SecurityGroupRule) -> String {
    if rule.ip_protocol == "-1" {
        return format!("{}:all_protocols:all_ports", rule.rule_type);
    }
    let ports = match (rule.from_port, rule.to_port) {
        (Some(from), Some(to)) if from == to => from.to_string(),
        (Some(from), Some(to)) => format!("{from}-{to}"),
        _ => "unknown".to_string(),
    };
    format!("{}:{}:{}", rule.rule_type, rule.ip_protocol, ports)
}

fn world_open_to_port(item: &mut ChangeItem, port: i64, issue: &str) {
    let ResourceConfig::SecurityGroup(config) = item.config.clone() else {
        return;
    };
    for rule in &config.rules {
        if rule.rule_type != "ingress" {
            continue;
        }
        let Some(cidr) = rule.cidr_ip.as_deref() else {
            continue;
        };
        if !cidr.ends_with("/0") {
            continue;
        }
        let Some((from, to)) = port_range(rule) else {
            continue;
        };
        if !(from <= port && port <= to) {
            continue;
        }
        let notes = format!("cidr:{cidr} Access: [{}]", port_phrase(rule));
        item.add_issue(10, issue, Some(notes), None);
    }
}

impl SecurityGroupAuditor {
    /// No security group may allow unrestricted ingress to port 22.
    /// A port value of ALL or a range such as 0-1024 includes port 22.
    fn check_ssh_open_to_world(
        &self,
        _ctx: &AuditContext<'_>,
        item: &mut ChangeItem,
    ) -> Result<(), AuditError> {
        world_open_to_port(
            item,
            22,
            "CIS 4.1 Security Group permits unrestricted ingress access to port 22",
        );
        Ok(())
    }

    /// No security group may allow unrestricted ingress to port 3389.
    fn check_rdp_open_to_world(
        &self,
        _ctx: &AuditContext<'_>,
        item: &mut ChangeItem,
    ) -> Result<(), AuditError> {
        world_open_to_port(
            item,
            3389,
            "CIS 4.2 Security Group permits unrestricted ingress access to port 3389",
        );
        Ok(())
    }

    /// The default security group of every VPC must restrict all traffic.
    fn check_default_group_restricts_traffic(
        &self,
        _ctx: &AuditContext<'_>,
        item: &mut ChangeItem,
    ) -> Result<(), AuditError> {
        let ResourceConfig::SecurityGroup(config) = item.config.clone() else {
            return Ok(());
        };
        if config.name != "default" || config.rules.is_empty() {
            return Ok(());
        }
        for rule in &config.rules {
            let issue = format!(
                "CIS 4.3 Default security group permits unrestricted {} access",
                rule.rule_type
            );
            let notes = format!(
                "cidr:{} Access: [{}]",
                rule.cidr_ip.as_deref().unwrap_or("unknown"),
                port_phrase(rule)
            );
            item.add_issue(10, issue, Some(notes), None);
        }
        Ok(())
    }
}

impl Auditor for SecurityGroupAuditor {
    fn index(&self) -> &'static str {
        tech::SECURITY_GROUP
    }

    fn name(&self) -> &'static str {
        "SecurityGroupAuditor"
    }

    fn checks(&self) -> Vec<Check<'_>> {
        vec![
            Check::new("check_ssh_open_to_world", |ctx, item| {
                self.check_ssh_open_to_world(ctx, item)
            }),
            Check::new("check_rdp_open_to_world", |ctx, item| {
                self.check_rdp_open_to_world(ctx, item)
            }),
            Check::new("check_default_group_restricts_traffic", |ctx, item| {
                self.check_default_group_restricts_traffic(ctx, item)
            }),
        ]
    }
}
