//! Shared in-memory fakes for application-layer tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::application::webhook::ProcessWebhookCommand;
use crate::domain::entitlement::{compute_test_signature, Entitlement, EntitlementStatus, WebhookError};
use crate::domain::foundation::{DomainError, EntitlementId, Timestamp};
use crate::ports::{CheckoutLineItem, DebugLogStore, EntitlementRepository, Notifier, NotifyError, PaymentDirectory};

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret_12345";

/// Builds a command with a valid signature for the given payload.
pub fn signed_command(payload: &serde_json::Value) -> ProcessWebhookCommand {
    let body = serde_json::to_string(payload).unwrap();
    let timestamp = chrono::Utc::now().timestamp();
    let signature = compute_test_signature(TEST_WEBHOOK_SECRET, timestamp, &body);
    ProcessWebhookCommand {
        payload: body.into_bytes(),
        signature: format!("t={},v1={}", timestamp, signature),
    }
}

/// In-memory entitlement repository with versioned conditional updates.
pub struct InMemoryRepository {
    records: Mutex<Vec<Entitlement>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn seed(&self, entitlement: Entitlement) {
        self.records.lock().unwrap().push(entitlement);
    }

    pub fn all(&self) -> Vec<Entitlement> {
        self.records.lock().unwrap().clone()
    }

    pub fn get(&self, id: &EntitlementId) -> Option<Entitlement> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|e| &e.id == id)
            .cloned()
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntitlementRepository for InMemoryRepository {
    async fn insert(&self, entitlement: &Entitlement) -> Result<(), DomainError> {
        self.records.lock().unwrap().push(entitlement.clone());
        Ok(())
    }

    async fn update(&self, entitlement: &Entitlement) -> Result<(), DomainError> {
        let mut records = self.records.lock().unwrap();
        let stored = records
            .iter_mut()
            .find(|e| e.id == entitlement.id)
            .ok_or_else(|| DomainError::not_found("Entitlement not found"))?;

        if stored.version != entitlement.version {
            return Err(DomainError::conflict(format!(
                "Version mismatch: stored {} vs expected {}",
                stored.version, entitlement.version
            )));
        }

        *stored = entitlement.clone();
        stored.version += 1;
        Ok(())
    }

    async fn find_by_id(&self, id: &EntitlementId) -> Result<Option<Entitlement>, DomainError> {
        Ok(self.get(id))
    }

    async fn find_completed_by_payment_id(
        &self,
        payment_id: &str,
    ) -> Result<Option<Entitlement>, DomainError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|e| {
                e.status == EntitlementStatus::Completed
                    && e.payment_id.as_deref() == Some(payment_id)
            })
            .cloned())
    }

    async fn find_newest_pending(
        &self,
        email: &str,
    ) -> Result<Option<Entitlement>, DomainError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.status == EntitlementStatus::Pending && e.user_email == email)
            .max_by_key(|e| e.created_at)
            .cloned())
    }

    async fn find_newest_completed(
        &self,
        email: &str,
    ) -> Result<Option<Entitlement>, DomainError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.status == EntitlementStatus::Completed && e.user_email == email)
            .max_by_key(|e| e.created_at)
            .cloned())
    }

    async fn find_expiring_candidates(
        &self,
        now: Timestamp,
        horizon_days: i64,
    ) -> Result<Vec<Entitlement>, DomainError> {
        let horizon = now.add_days(horizon_days);
        let mut out: Vec<Entitlement> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|e| {
                e.status == EntitlementStatus::Completed
                    && e.expires_at.map(|x| x <= horizon).unwrap_or(false)
                    && (!e.notified_7d || !e.notified_1d || !e.notified_expired)
            })
            .cloned()
            .collect();
        out.sort_by_key(|e| e.expires_at);
        Ok(out)
    }
}

/// Repository whose every operation fails, for store-outage paths.
pub struct FailingRepository;

#[async_trait]
impl EntitlementRepository for FailingRepository {
    async fn insert(&self, _entitlement: &Entitlement) -> Result<(), DomainError> {
        Err(DomainError::database("store unavailable"))
    }

    async fn update(&self, _entitlement: &Entitlement) -> Result<(), DomainError> {
        Err(DomainError::database("store unavailable"))
    }

    async fn find_by_id(&self, _id: &EntitlementId) -> Result<Option<Entitlement>, DomainError> {
        Err(DomainError::database("store unavailable"))
    }

    async fn find_completed_by_payment_id(
        &self,
        _payment_id: &str,
    ) -> Result<Option<Entitlement>, DomainError> {
        Err(DomainError::database("store unavailable"))
    }

    async fn find_newest_pending(
        &self,
        _email: &str,
    ) -> Result<Option<Entitlement>, DomainError> {
        Err(DomainError::database("store unavailable"))
    }

    async fn find_newest_completed(
        &self,
        _email: &str,
    ) -> Result<Option<Entitlement>, DomainError> {
        Err(DomainError::database("store unavailable"))
    }

    async fn find_expiring_candidates(
        &self,
        _now: Timestamp,
        _horizon_days: i64,
    ) -> Result<Vec<Entitlement>, DomainError> {
        Err(DomainError::database("store unavailable"))
    }
}

/// Static payment-directory fake.
#[derive(Default)]
pub struct StaticDirectory {
    customers: HashMap<String, String>,
    line_item: Option<CheckoutLineItem>,
    fail_product_lookup: bool,
}

impl StaticDirectory {
    pub fn with_customer(customer_id: &str, email: &str) -> Self {
        let mut customers = HashMap::new();
        customers.insert(customer_id.to_string(), email.to_string());
        Self {
            customers,
            ..Default::default()
        }
    }

    pub fn with_product(product_id: &str, price_id: Option<&str>) -> Self {
        Self {
            line_item: Some(CheckoutLineItem {
                product_id: product_id.to_string(),
                price_id: price_id.map(String::from),
            }),
            ..Default::default()
        }
    }

    pub fn failing_product_lookup() -> Self {
        Self {
            fail_product_lookup: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl PaymentDirectory for StaticDirectory {
    async fn customer_email(&self, customer_id: &str) -> Result<Option<String>, WebhookError> {
        Ok(self.customers.get(customer_id).cloned())
    }

    async fn checkout_line_item(
        &self,
        _session_id: &str,
    ) -> Result<Option<CheckoutLineItem>, WebhookError> {
        if self.fail_product_lookup {
            return Err(WebhookError::Provider("simulated lookup failure".to_string()));
        }
        Ok(self.line_item.clone())
    }
}

/// Notifier that records messages instead of sending them.
pub struct RecordingNotifier {
    admin: Mutex<Vec<String>>,
    customer: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            admin: Mutex::new(Vec::new()),
            customer: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A notifier whose every delivery fails.
    pub fn failing() -> Self {
        Self {
            admin: Mutex::new(Vec::new()),
            customer: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn admin_messages(&self) -> Vec<String> {
        self.admin.lock().unwrap().clone()
    }

    pub fn customer_messages(&self) -> Vec<(String, String)> {
        self.customer.lock().unwrap().clone()
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_admin(&self, text: &str) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Network("simulated outage".to_string()));
        }
        self.admin.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn send_customer(&self, email: &str, text: &str) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Network("simulated outage".to_string()));
        }
        self.customer
            .lock()
            .unwrap()
            .push((email.to_string(), text.to_string()));
        Ok(())
    }
}

/// Debug log that collects entries in memory.
pub struct InMemoryDebugLog {
    entries: Mutex<Vec<String>>,
}

impl InMemoryDebugLog {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

impl Default for InMemoryDebugLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DebugLogStore for InMemoryDebugLog {
    async fn append(&self, entry: &str) -> Result<(), DomainError> {
        self.entries.lock().unwrap().push(entry.to_string());
        Ok(())
    }
}
