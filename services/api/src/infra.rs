use arcade_registry::config::RegistryConfig;
use arcade_registry::workflows::collection::{
    AllowListPolicy, CollectionService, InMemoryImageStore, InMemoryRecordStore, Notification,
    NotificationError, Notifier,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type RegistryService =
    CollectionService<InMemoryRecordStore, LogNotifier, InMemoryImageStore>;

/// Writes staff notifications to the structured log until a mail relay is wired in.
#[derive(Debug, Clone, Default)]
pub(crate) struct LogNotifier {
    recipient: Option<String>,
}

impl LogNotifier {
    pub(crate) fn new(recipient: Option<String>) -> Self {
        Self { recipient }
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotificationError> {
        let details = serde_json::to_string(&notification.details)
            .map_err(|err| NotificationError::Transport(err.to_string()))?;
        info!(
            event = ?notification.event,
            item_id = %notification.item_id.0,
            recipient = self.recipient.as_deref().unwrap_or("unset"),
            details,
            "staff notification"
        );
        Ok(())
    }
}

pub(crate) fn staff_policy(config: &RegistryConfig) -> AllowListPolicy {
    let policy = AllowListPolicy::new(&config.staff_emails);
    if policy.is_empty() {
        warn!("REGISTRY_STAFF_EMAILS is empty; every staff operation will be refused");
    }
    policy
}

pub(crate) fn build_service(config: &RegistryConfig) -> RegistryService {
    CollectionService::new(
        Arc::new(InMemoryRecordStore::default()),
        Arc::new(LogNotifier::new(config.notify_email.clone())),
        Arc::new(InMemoryImageStore::default()),
        Arc::new(staff_policy(config)),
    )
}
