pub mod api;
pub mod applications;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod notifications;
pub mod users;

pub use db::DbPool;

use config::Config;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use crate::applications::ApplicationWorkflow;
use crate::auth::{AccessPolicy, TokenService};
use crate::jobs::JobStore;
use crate::notifications::{NotificationStore, Notifier, PushHub};
use crate::users::UserDirectory;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub tokens: TokenService,
    pub policy: AccessPolicy,
    pub users: UserDirectory,
    pub jobs: JobStore,
    pub applications: ApplicationWorkflow,
    pub notifications: NotificationStore,
    pub hub: Arc<PushHub>,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool, notifier: Notifier, hub: Arc<PushHub>) -> Self {
        let tokens = TokenService::from_config(&config.auth);
        Self {
            tokens,
            policy: AccessPolicy::standard(),
            users: UserDirectory::new(db.clone()),
            jobs: JobStore::new(db.clone(), notifier.clone()),
            applications: ApplicationWorkflow::new(db.clone(), notifier),
            notifications: NotificationStore::new(db.clone()),
            hub,
            config,
            db,
            metrics_handle: None,
        }
    }

    /// Set the Prometheus metrics handle
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}
