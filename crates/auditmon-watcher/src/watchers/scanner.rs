use crate::{AccountRef, SlurpResult, Watcher, WatcherError};
use auditmon_common::config::{tech, ResourceConfig, ScanConfig, ScanVuln};
use auditmon_common::types::ChangeItem;
use std::collections::BTreeMap;

/// One configured image-scanner engine endpoint.
#[derive(Debug, Clone)]
pub struct ScannerEndpoint {
    pub name: String,
    pub username: String,
    pub password: String,
    pub url: String,
    pub ssl_verify: bool,
}

/// Polls external image-scanner engines over their REST API (basic
/// auth) and emits one item per vulnerable package per image.
///
/// Endpoints are configured in the database, so unlike the
/// connector-backed watchers this one is constructed per run with the
/// current endpoint list.
pub struct ScannerWatcher {
    endpoints: Vec<ScannerEndpoint>,
}

impl ScannerWatcher {
    pub fn new(endpoints: Vec<ScannerEndpoint>) -> Self {
        Self { endpoints }
    }

    fn client(endpoint: &ScannerEndpoint) -> Result<reqwest::Client, WatcherError> {
        reqwest::Client::builder()
            .danger_accept_invalid_certs(!endpoint.ssl_verify)
            .build()
            .map_err(|e| WatcherError::Connection(e.to_string()))
    }

    async fn get_json(
        client: &reqwest::Client,
        endpoint: &ScannerEndpoint,
        path: &str,
    ) -> Result<serde_json::Value, WatcherError> {
        let base = endpoint.url.trim_end_matches('/');
        let url = format!("{base}/{path}");
        let response = client
            .get(&url)
            .basic_auth(&endpoint.username, Some(&endpoint.password))
            .send()
            .await
            .map_err(|e| WatcherError::Connection(e.to_string()))?;
        if !response.status().is_success() {
            return Err(WatcherError::Provider(format!(
                "scanner returned HTTP {} for {url}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| WatcherError::Provider(e.to_string()))
    }

    async fn slurp_endpoint(
        &self,
        endpoint: &ScannerEndpoint,
        accounts: &[AccountRef],
        result: &mut SlurpResult,
    ) -> Result<(), WatcherError> {
        let client = Self::client(endpoint)?;
        let images = Self::get_json(&client, endpoint, "images").await?;
        let Some(images) = images.as_array() else {
            return Err(WatcherError::Provider(
                "scanner image listing is not an array".into(),
            ));
        };

        for image in images {
            let Some(detail) = image
                .pointer("/image_detail/0")
                .and_then(|v| v.as_object())
            else {
                continue;
            };
            let digest = detail.get("imageDigest").and_then(|v| v.as_str());
            let fulltag = detail.get("fulltag").and_then(|v| v.as_str());
            let (Some(digest), Some(fulltag)) = (digest, fulltag) else {
                continue;
            };

            // Registry host leads with the account identifier:
            // 123456789012.dkr.ecr.us-east-1.amazonaws.com/app:latest
            let host = fulltag.split('/').next().unwrap_or("");
            let identifier = host.split('.').next().unwrap_or("");
            let Some(account) = accounts.iter().find(|a| a.identifier == identifier) else {
                tracing::debug!(image = fulltag, "Skipping image for unmonitored account");
                continue;
            };
            let host_parts: Vec<&str> = host.split('.').collect();
            let region = if host_parts.len() >= 3 {
                host_parts[host_parts.len() - 3].to_string()
            } else {
                "unknown".to_string()
            };

            let repo = detail
                .get("repo")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            let tag = detail
                .get("tag")
                .and_then(|v| v.as_str())
                .unwrap_or("latest");

            let report = match Self::get_json(
                &client,
                endpoint,
                &format!("images/{digest}/vuln/os?vendor_only=false"),
            )
            .await
            {
                Ok(report) => report,
                Err(e) => {
                    tracing::warn!(image = fulltag, error = %e, "Skipping unscannable image");
                    continue;
                }
            };
            let vulnerabilities = report
                .get("vulnerabilities")
                .and_then(|v| v.as_array())
                .cloned()
                .unwrap_or_default();

            let os = image
                .pointer("/image_content/metadata/distro")
                .and_then(|v| v.as_str())
                .map(String::from);
            let os_version = image
                .pointer("/image_content/metadata/distro_version")
                .and_then(|v| v.as_str())
                .map(String::from);

            let mut packages: BTreeMap<String, Vec<ScanVuln>> = BTreeMap::new();
            for vuln in &vulnerabilities {
                let Some(package) = vuln.get("package").and_then(|v| v.as_str()) else {
                    continue;
                };
                packages.entry(package.to_string()).or_default().push(ScanVuln {
                    package: package.to_string(),
                    fix: vuln.get("fix").and_then(|v| v.as_str()).map(String::from),
                    vuln_id: vuln
                        .get("vuln")
                        .and_then(|v| v.as_str())
                        .unwrap_or("unknown")
                        .to_string(),
                    severity: vuln
                        .get("severity")
                        .and_then(|v| v.as_str())
                        .unwrap_or("Unknown")
                        .to_string(),
                    information: vuln.get("url").and_then(|v| v.as_str()).map(String::from),
                });
            }

            for (package, vulns) in packages {
                let name = format!("{repo}:{tag}/{package}");
                if account.ignores(&name) {
                    continue;
                }
                let arn = format!("arn:scanner:{fulltag}/{package}");
                result.items.push(ChangeItem::new(
                    &account.name,
                    &region,
                    &name,
                    Some(arn),
                    ResourceConfig::Scan(ScanConfig {
                        aws_account_id: account.identifier.clone(),
                        repo_name: repo.to_string(),
                        repo_tag: tag.to_string(),
                        os: os.clone(),
                        os_version: os_version.clone(),
                        package,
                        vulns,
                    }),
                ));
            }
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl Watcher for ScannerWatcher {
    fn index(&self) -> &'static str {
        tech::SCANNER
    }

    async fn slurp(&self, accounts: &[AccountRef]) -> SlurpResult {
        let mut result = SlurpResult::default();

        for endpoint in &self.endpoints {
            if let Err(e) = self.slurp_endpoint(endpoint, accounts, &mut result).await {
                // Endpoint-level failures are keyed by the endpoint name
                // because no single account owns the scanner.
                result.record_exception(self.index(), &endpoint.name, "universal", e);
            }
        }

        result
    }
}
