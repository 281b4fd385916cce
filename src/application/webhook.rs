//! PaymentEventProcessor - maps Stripe lifecycle events onto entitlements.
//!
//! One signed event in, at most one entitlement transition out:
//!
//! - `checkout.session.completed` -> activate (or synthesize) a record
//! - `invoice.paid`               -> extend the newest completed record
//! - `customer.subscription.deleted` -> expire the newest completed record
//! - `invoice.payment_failed`    -> admin alert only, no transition
//!
//! Signature verification happens before anything else; an unverified
//! event never touches state. Every mutation is protected either by the
//! payment-id idempotency check or by a versioned conditional update, so
//! the whole handler is safe to re-invoke when Stripe retries delivery.

use std::sync::Arc;

use crate::domain::entitlement::{
    CheckoutSessionObject, Entitlement, InvoiceObject, PlanCatalog, StripeEvent, StripeEventType,
    StripeWebhookVerifier, SubscriptionObject, WebhookError,
};
use crate::domain::foundation::{EntitlementId, Timestamp};
use crate::ports::{DebugLogStore, EntitlementRepository, Notifier, PaymentDirectory};

/// Command to process one payment webhook delivery.
#[derive(Debug, Clone)]
pub struct ProcessWebhookCommand {
    /// Raw webhook payload bytes, exactly as received.
    pub payload: Vec<u8>,
    /// Value of the `stripe-signature` header.
    pub signature: String,
}

/// Result of webhook processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Checkout completed; a record reached `completed`.
    Activated {
        entitlement_id: String,
        email: String,
    },
    /// Renewal invoice paid; expiry extended.
    Renewed {
        entitlement_id: String,
        email: String,
    },
    /// Subscription cancelled; record expired.
    Cancelled {
        entitlement_id: String,
        email: String,
    },
    /// Payment failed; admin alerted, no state change.
    PaymentFailureNoticed { email: String, attempt: i32 },
    /// Duplicate delivery of an already-applied payment.
    AlreadyProcessed,
    /// Event acknowledged without action (unknown type, filtered
    /// product, first invoice, nothing to act on).
    Ignored(String),
}

impl WebhookOutcome {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            WebhookOutcome::Activated { .. } => "activated",
            WebhookOutcome::Renewed { .. } => "renewed",
            WebhookOutcome::Cancelled { .. } => "cancelled",
            WebhookOutcome::PaymentFailureNoticed { .. } => "payment_failed",
            WebhookOutcome::AlreadyProcessed => "already_processed",
            WebhookOutcome::Ignored(_) => "ignored",
        }
    }
}

/// Processes signed payment-provider events into entitlement transitions.
pub struct PaymentEventProcessor {
    repository: Arc<dyn EntitlementRepository>,
    directory: Arc<dyn PaymentDirectory>,
    notifier: Arc<dyn Notifier>,
    debug_log: Arc<dyn DebugLogStore>,
    verifier: StripeWebhookVerifier,
    catalog: PlanCatalog,
    allowed_products: Vec<String>,
}

impl PaymentEventProcessor {
    pub fn new(
        repository: Arc<dyn EntitlementRepository>,
        directory: Arc<dyn PaymentDirectory>,
        notifier: Arc<dyn Notifier>,
        debug_log: Arc<dyn DebugLogStore>,
        verifier: StripeWebhookVerifier,
        catalog: PlanCatalog,
        allowed_products: Vec<String>,
    ) -> Self {
        Self {
            repository,
            directory,
            notifier,
            debug_log,
            verifier,
            catalog,
            allowed_products,
        }
    }

    /// Verify, classify, and apply one webhook event.
    pub async fn handle(
        &self,
        cmd: ProcessWebhookCommand,
    ) -> Result<WebhookOutcome, WebhookError> {
        let event = match self.verifier.verify_and_parse(&cmd.payload, &cmd.signature) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "Webhook rejected before processing");
                self.append_debug_log(&format!("delivery rejected: {}", e)).await;
                return Err(e);
            }
        };

        tracing::info!(event_id = %event.id, event_type = %event.event_type, "Webhook verified");

        let result = match event.parsed_type() {
            StripeEventType::CheckoutSessionCompleted => {
                self.handle_checkout_completed(&event).await
            }
            StripeEventType::InvoicePaid => self.handle_invoice_paid(&event).await,
            StripeEventType::InvoicePaymentFailed => {
                self.handle_invoice_payment_failed(&event).await
            }
            StripeEventType::CustomerSubscriptionDeleted => {
                self.handle_subscription_deleted(&event).await
            }
            StripeEventType::Unknown => {
                tracing::info!(event_type = %event.event_type, "Ignored event type");
                Ok(WebhookOutcome::Ignored(format!(
                    "unhandled event type {}",
                    event.event_type
                )))
            }
        };

        let log_line = match &result {
            Ok(outcome) => format!(
                "event {} ({}): {}",
                event.id,
                event.event_type,
                outcome.label()
            ),
            Err(e) => format!("event {} ({}): error: {}", event.id, event.event_type, e),
        };
        self.append_debug_log(&log_line).await;

        result
    }

    // ────────────────────────────────────────────────────────────────
    // checkout.session.completed
    // ────────────────────────────────────────────────────────────────

    async fn handle_checkout_completed(
        &self,
        event: &StripeEvent,
    ) -> Result<WebhookOutcome, WebhookError> {
        let session: CheckoutSessionObject = event
            .deserialize_object()
            .map_err(|e| WebhookError::ParseError(format!("invalid checkout session: {}", e)))?;

        // Product allow-list check. Other products share the same Stripe
        // account; their checkouts must not touch the entitlement store.
        let price_id = match self.directory.checkout_line_item(&session.id).await {
            Ok(Some(item)) => {
                if !self.allowed_products.contains(&item.product_id) {
                    tracing::info!(
                        product_id = %item.product_id,
                        session_id = %session.id,
                        "Ignored checkout for non-allow-listed product"
                    );
                    return Ok(WebhookOutcome::Ignored(format!(
                        "product {} not in allow-list",
                        item.product_id
                    )));
                }
                item.price_id
            }
            Ok(None) => None,
            Err(e) => {
                // A lookup failure must not drop a legitimate payment.
                tracing::warn!(session_id = %session.id, error = %e, "Product lookup failed, proceeding");
                None
            }
        };

        let Some(email) = self
            .resolve_email(session.embedded_email(), session.customer.as_deref())
            .await
        else {
            return self.email_unresolved(&event.event_type).await;
        };

        let has_subscription = session.subscription.is_some();
        let plan = self
            .catalog
            .resolve(price_id.as_deref(), session.amount_total, has_subscription);
        let expires_at = plan
            .duration_days()
            .map(|days| Timestamp::now().add_days(days));

        // Idempotency: Stripe redelivers on timeouts; the same payment
        // reference must never activate twice.
        if self
            .repository
            .find_completed_by_payment_id(&session.id)
            .await?
            .is_some()
        {
            tracing::info!(payment_id = %session.id, "Payment already applied, skipping");
            return Ok(WebhookOutcome::AlreadyProcessed);
        }

        let entitlement = match self.repository.find_newest_pending(&email).await? {
            Some(mut pending) => {
                pending.complete(
                    session.id.clone(),
                    session.subscription.clone(),
                    expires_at,
                )?;
                self.repository.update(&pending).await?;
                tracing::info!(
                    entitlement_id = %pending.id,
                    email = %email,
                    "Pending entitlement activated"
                );
                pending
            }
            None => {
                let record = Entitlement::new_completed(
                    EntitlementId::new(),
                    email.clone(),
                    plan,
                    session.id.clone(),
                    session.subscription.clone(),
                    expires_at,
                );
                self.repository.insert(&record).await?;
                tracing::info!(
                    entitlement_id = %record.id,
                    email = %email,
                    "No pending record, synthesized completed entitlement"
                );
                record
            }
        };

        let amount = format_amount(session.amount_total, session.currency.as_deref());
        let expiry = format_expiry(expires_at);
        self.notify_admin(&format!(
            "💰 *PAYMENT RECEIVED*\n\n👤 User: `{}`\n💸 Amount: *{}*\n🆔 Payment ID: `{}`\n📅 Expires: *{}*",
            email, amount, session.id, expiry
        ))
        .await;

        Ok(WebhookOutcome::Activated {
            entitlement_id: entitlement.id.to_string(),
            email,
        })
    }

    // ────────────────────────────────────────────────────────────────
    // invoice.paid (renewal)
    // ────────────────────────────────────────────────────────────────

    async fn handle_invoice_paid(
        &self,
        event: &StripeEvent,
    ) -> Result<WebhookOutcome, WebhookError> {
        let invoice: InvoiceObject = event
            .deserialize_object()
            .map_err(|e| WebhookError::ParseError(format!("invalid invoice: {}", e)))?;

        if let Some(product_id) = invoice.first_line_product() {
            if !self.allowed_products.iter().any(|p| p == product_id) {
                tracing::info!(product_id = %product_id, "Ignored renewal for non-allow-listed product");
                return Ok(WebhookOutcome::Ignored(format!(
                    "renewal product {} not in allow-list",
                    product_id
                )));
            }
        }

        // The subscription's first invoice was already applied by the
        // checkout-completed handler.
        if invoice.is_first_invoice() {
            tracing::info!(invoice_id = %invoice.id, "Ignored first invoice");
            return Ok(WebhookOutcome::Ignored(
                "first invoice handled by checkout".to_string(),
            ));
        }

        let Some(email) = self
            .resolve_email(invoice.customer_email.as_deref(), invoice.customer.as_deref())
            .await
        else {
            return self.email_unresolved(&event.event_type).await;
        };

        let Some(mut entitlement) = self.repository.find_newest_completed(&email).await? else {
            tracing::warn!(email = %email, "No completed entitlement found for renewal");
            return Ok(WebhookOutcome::Ignored(
                "no completed entitlement for renewal".to_string(),
            ));
        };

        // Extend from whichever is later, the current expiry or now, so an
        // early renewal never shortens the remaining period.
        let now = Timestamp::now();
        let base = match entitlement.expires_at {
            Some(current) if current.is_after(&now) => current,
            _ => now,
        };
        let extension_days = entitlement.plan.duration_days().unwrap_or(30);
        let new_expiry = base.add_days(extension_days);

        entitlement.renew(new_expiry, invoice.subscription.clone())?;
        self.repository.update(&entitlement).await?;

        tracing::info!(
            entitlement_id = %entitlement.id,
            email = %email,
            new_expiry = %new_expiry,
            "Renewal applied"
        );

        let amount = format_amount(Some(invoice.amount_paid), invoice.currency.as_deref());
        self.notify_admin(&format!(
            "🔄 *RENEWAL PAID*\n\n👤 User: `{}`\n💸 Amount: *{}*\n📅 Extended until: *{}*",
            email, amount, format_expiry(Some(new_expiry))
        ))
        .await;
        self.notify_customer(
            &email,
            &format!(
                "Your Crypto Analyzer Pro subscription has been renewed. It now runs until {}.",
                format_expiry(Some(new_expiry))
            ),
        )
        .await;

        Ok(WebhookOutcome::Renewed {
            entitlement_id: entitlement.id.to_string(),
            email,
        })
    }

    // ────────────────────────────────────────────────────────────────
    // customer.subscription.deleted (cancellation)
    // ────────────────────────────────────────────────────────────────

    async fn handle_subscription_deleted(
        &self,
        event: &StripeEvent,
    ) -> Result<WebhookOutcome, WebhookError> {
        let subscription: SubscriptionObject = event
            .deserialize_object()
            .map_err(|e| WebhookError::ParseError(format!("invalid subscription: {}", e)))?;

        let Some(email) = self
            .resolve_email(None, Some(subscription.customer.as_str()))
            .await
        else {
            return self.email_unresolved(&event.event_type).await;
        };

        let Some(mut entitlement) = self.repository.find_newest_completed(&email).await? else {
            tracing::warn!(email = %email, "No completed entitlement found to expire");
            return Ok(WebhookOutcome::Ignored(
                "no completed entitlement to expire".to_string(),
            ));
        };

        entitlement.expire()?;
        self.repository.update(&entitlement).await?;

        tracing::info!(
            entitlement_id = %entitlement.id,
            email = %email,
            "Subscription cancelled, entitlement expired"
        );

        self.notify_admin(&format!(
            "🚫 *SUBSCRIPTION CANCELLED*\n\n👤 User: `{}`\n📉 Status: *FREE TIER*",
            email
        ))
        .await;
        self.notify_customer(
            &email,
            "Your Crypto Analyzer Pro subscription has ended. Your account is now on the free tier.",
        )
        .await;

        Ok(WebhookOutcome::Cancelled {
            entitlement_id: entitlement.id.to_string(),
            email,
        })
    }

    // ────────────────────────────────────────────────────────────────
    // invoice.payment_failed
    // ────────────────────────────────────────────────────────────────

    async fn handle_invoice_payment_failed(
        &self,
        event: &StripeEvent,
    ) -> Result<WebhookOutcome, WebhookError> {
        let invoice: InvoiceObject = event
            .deserialize_object()
            .map_err(|e| WebhookError::ParseError(format!("invalid invoice: {}", e)))?;

        let Some(email) = self
            .resolve_email(invoice.customer_email.as_deref(), invoice.customer.as_deref())
            .await
        else {
            return self.email_unresolved(&event.event_type).await;
        };

        // A transient failure is not a cancellation: Stripe retries and
        // eventually sends subscription.deleted, which we handle above.
        tracing::warn!(
            email = %email,
            attempt = invoice.attempt_count,
            "Invoice payment failed"
        );

        self.notify_admin(&format!(
            "⚠️ *PAYMENT FAILED*\n\n👤 User: `{}`\n🔄 Attempt: #{}\n❌ Automatic renewal ran into a problem",
            email, invoice.attempt_count
        ))
        .await;

        Ok(WebhookOutcome::PaymentFailureNoticed {
            email,
            attempt: invoice.attempt_count,
        })
    }

    // ────────────────────────────────────────────────────────────────
    // Helpers
    // ────────────────────────────────────────────────────────────────

    /// Resolve the paying user's email: embedded fields first, then the
    /// provider's customer record.
    async fn resolve_email(
        &self,
        embedded: Option<&str>,
        customer_id: Option<&str>,
    ) -> Option<String> {
        if let Some(email) = embedded {
            return Some(email.to_string());
        }

        let customer_id = customer_id?;
        match self.directory.customer_email(customer_id).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(customer_id = %customer_id, error = %e, "Customer lookup failed");
                None
            }
        }
    }

    async fn email_unresolved(
        &self,
        event_type: &str,
    ) -> Result<WebhookOutcome, WebhookError> {
        tracing::warn!(event_type = %event_type, "No email derivable from event");
        self.notify_admin(&format!(
            "⚠️ *UNRESOLVED PAYMENT EVENT*\n\nReceived `{}` but no customer email could be resolved.",
            event_type
        ))
        .await;
        Err(WebhookError::EmailUnresolved)
    }

    async fn notify_admin(&self, text: &str) {
        if let Err(e) = self.notifier.send_admin(text).await {
            tracing::warn!(error = %e, "Admin notification failed");
        }
    }

    async fn notify_customer(&self, email: &str, text: &str) {
        if let Err(e) = self.notifier.send_customer(email, text).await {
            tracing::warn!(email = %email, error = %e, "Customer notification failed");
        }
    }

    async fn append_debug_log(&self, line: &str) {
        let entry = format!("[{}] {}", Timestamp::now(), line);
        if let Err(e) = self.debug_log.append(&entry).await {
            tracing::warn!(error = %e, "Failed to persist debug log entry");
        }
    }
}

fn format_amount(amount_cents: Option<i64>, currency: Option<&str>) -> String {
    match amount_cents {
        Some(cents) => format!(
            "{:.2} {}",
            cents as f64 / 100.0,
            currency.unwrap_or("eur").to_uppercase()
        ),
        None => "N/A".to_string(),
    }
}

fn format_expiry(expires_at: Option<Timestamp>) -> String {
    match expires_at {
        Some(ts) => ts.as_datetime().format("%Y-%m-%d").to_string(),
        None => "never (lifetime)".to_string(),
    }
}
