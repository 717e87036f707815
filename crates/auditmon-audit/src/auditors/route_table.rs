use crate::auditors::INFORMATIONAL;
use crate::{AuditContext, AuditError, Auditor, Check};
use auditmon_common::config::{tech, ResourceConfig};
use auditmon_common::types::ChangeItem;

pub struct RouteTableAuditor;

impl RouteTableAuditor {
    /// Routing tables for VPC peering must be "least access": a peer
    /// route wider than /24 is worth investigating.
    fn check_peering_routes_least_access(
        &self,
        _ctx: &AuditContext<'_>,
        item: &mut ChangeItem,
    ) -> Result<(), AuditError> {
        let ResourceConfig::RouteTable(config) = item.config.clone() else {
            return Ok(());
        };
        for route in &config.routes {
            if route.vpc_peering_connection_id.is_none() {
                continue;
            }
            let Some(cidr) = route.destination_cidr_block.as_deref() else {
                continue;
            };
            let prefix: u32 = cidr
                .split_once('/')
                .map(|(_, p)| p)
                .ok_or_else(|| AuditError::Malformed(format!("cidr without prefix: {cidr}")))?
                .parse()
                .map_err(|_| AuditError::Malformed(format!("unparsable cidr prefix: {cidr}")))?;
            if prefix < 24 {
                item.add_issue(
                    10,
                    INFORMATIONAL,
                    Some(
                        "sa-cis-4.4 - Large CIDR block routed to peer discovered, please investigate."
                            .to_string(),
                    ),
                    None,
                );
            }
        }
        Ok(())
    }
}

impl Auditor for RouteTableAuditor {
    fn index(&self) -> &'static str {
        tech::ROUTE_TABLE
    }

    fn name(&self) -> &'static str {
        "RouteTableAuditor"
    }

    fn checks(&self) -> Vec<Check<'_>> {
        vec![Check::new("check_peering_routes_least_access", |ctx, item| {
            self.check_peering_routes_least_access(ctx, item)
        })]
    }
}
