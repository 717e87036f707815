use crate::{AccountRef, Connector, SlurpResult, Watcher};
use auditmon_common::config::{tech, ResourceConfig, UNIVERSAL_REGION};
use auditmon_common::types::ChangeItem;
use std::sync::Arc;

pub struct S3Watcher {
    connector: Arc<dyn Connector>,
}

impl S3Watcher {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }
}

#[async_trait::async_trait]
impl Watcher for S3Watcher {
    fn index(&self) -> &'static str {
        tech::S3
    }

    async fn slurp(&self, accounts: &[AccountRef]) -> SlurpResult {
        let mut result = SlurpResult::default();

        for account in accounts {
            let mut next_token: Option<String> = None;
            loop {
                let page = match self
                    .connector
                    .list_buckets(&account.name, next_token.as_deref())
                    .await
                {
                    Ok(page) => page,
                    Err(e) => {
                        result.record_exception(
                            self.index(),
                            &account.name,
                            UNIVERSAL_REGION,
                            e.into(),
                        );
                        break;
                    }
                };

                for bucket in page.items {
                    if account.ignores(&bucket.bucket_name) {
                        continue;
                    }
                    let name = bucket.bucket_name.clone();
                    let arn = format!("arn:aws:s3:::{name}");
                    result.items.push(ChangeItem::new(
                        &account.name,
                        UNIVERSAL_REGION,
                        &name,
                        Some(arn),
                        ResourceConfig::S3(bucket),
                    ));
                }

                next_token = page.next_token;
                if next_token.is_none() {
                    break;
                }
            }
        }

        result
    }
}
