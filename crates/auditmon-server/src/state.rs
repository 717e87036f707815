use crate::config::ServerConfig;
use auditmon_storage::Store;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub config: Arc<ServerConfig>,
    pub start_time: DateTime<Utc>,
}
