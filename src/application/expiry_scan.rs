//! ExpiryScanJob - daily sweep over expiring entitlements.
//!
//! One repository query pulls every completed record whose expiry falls
//! inside the scan horizon; the remaining time is then classified into a
//! notification threshold. Records already notified for their threshold
//! are skipped, which is the sole mechanism preventing duplicate
//! notifications across repeated daily runs.
//!
//! Per-record failures are logged and skipped; the job always finishes
//! the sweep and reports how much it actually did.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::entitlement::{NotificationThreshold, SCAN_HORIZON_DAYS};
use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{DebugLogStore, EntitlementRepository, Notifier};

/// Counts of records affected by one scan run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    /// Records transitioned to `expired`.
    pub expired: u32,
    /// Records given their 1-day warning.
    pub notified_1d: u32,
    /// Records given their 7-day warning.
    pub notified_7d: u32,
}

impl ScanSummary {
    /// Human-readable one-liner for logs and the job response.
    pub fn summary_line(&self) -> String {
        format!(
            "Scan complete: {} expired, {} 1-day notices, {} 7-day notices",
            self.expired, self.notified_1d, self.notified_7d
        )
    }
}

/// Scheduled sweep that reclassifies lapsed records and emits
/// each threshold notification exactly once.
pub struct ExpiryScanJob {
    repository: Arc<dyn EntitlementRepository>,
    notifier: Arc<dyn Notifier>,
    debug_log: Arc<dyn DebugLogStore>,
    dashboard_url: String,
}

impl ExpiryScanJob {
    pub fn new(
        repository: Arc<dyn EntitlementRepository>,
        notifier: Arc<dyn Notifier>,
        debug_log: Arc<dyn DebugLogStore>,
        dashboard_url: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            notifier,
            debug_log,
            dashboard_url: dashboard_url.into(),
        }
    }

    /// Run one sweep.
    ///
    /// # Errors
    ///
    /// Only the initial candidate query can fail the run; everything
    /// after is best-effort per record.
    pub async fn run(&self) -> Result<ScanSummary, DomainError> {
        let now = Timestamp::now();
        let candidates = self
            .repository
            .find_expiring_candidates(now, SCAN_HORIZON_DAYS)
            .await?;

        tracing::info!(candidates = candidates.len(), "Expiry scan started");

        let mut summary = ScanSummary::default();

        for mut record in candidates {
            let Some(remaining) = record.remaining_until_expiry(now) else {
                continue;
            };
            let Some(threshold) = NotificationThreshold::classify(remaining) else {
                continue;
            };
            if record.already_notified(threshold) {
                continue;
            }

            let email = record.user_email.clone();
            let result = match threshold {
                NotificationThreshold::Expired => {
                    match record.expire() {
                        Ok(()) => {}
                        Err(e) => {
                            tracing::warn!(entitlement_id = %record.id, error = %e, "Skipping record");
                            continue;
                        }
                    }
                    self.repository.update(&record).await.map(|()| {
                        summary.expired += 1;
                    })
                }
                NotificationThreshold::OneDay | NotificationThreshold::SevenDays => {
                    record.mark_notified(threshold);
                    self.repository.update(&record).await.map(|()| {
                        match threshold {
                            NotificationThreshold::OneDay => summary.notified_1d += 1,
                            _ => summary.notified_7d += 1,
                        }
                    })
                }
            };

            // A flag write that lost a race (e.g. a renewal landed mid-scan)
            // is dropped here; the next daily run re-evaluates the record.
            if let Err(e) = result {
                tracing::warn!(entitlement_id = %record.id, error = %e, "Scan update failed, continuing");
                continue;
            }

            self.send_notifications(threshold, &email, remaining).await;
        }

        tracing::info!(
            expired = summary.expired,
            notified_1d = summary.notified_1d,
            notified_7d = summary.notified_7d,
            "Expiry scan finished"
        );

        let entry = format!("[{}] [CRON] {}", Timestamp::now(), summary.summary_line());
        if let Err(e) = self.debug_log.append(&entry).await {
            tracing::warn!(error = %e, "Failed to persist scan log entry");
        }

        Ok(summary)
    }

    async fn send_notifications(
        &self,
        threshold: NotificationThreshold,
        email: &str,
        remaining: chrono::Duration,
    ) {
        match threshold {
            NotificationThreshold::Expired => {
                self.notify_customer(
                    email,
                    &format!(
                        "Your Crypto Analyzer Pro subscription has expired. Your account is now \
                         on the free tier. Reactivate at {} to restore PRO features.",
                        self.dashboard_url
                    ),
                )
                .await;
                self.notify_admin(&format!(
                    "🚫 *SUBSCRIPTION EXPIRED*\n\n👤 `{}`\n📉 Status: *FREE TIER*",
                    email
                ))
                .await;
            }
            NotificationThreshold::OneDay => {
                self.notify_customer(
                    email,
                    &format!(
                        "Your Crypto Analyzer Pro subscription expires tomorrow! Renew at {} \
                         to keep unlimited analyses and alerts.",
                        self.dashboard_url
                    ),
                )
                .await;
                self.notify_admin(&format!(
                    "⚠️ *EXPIRES TOMORROW*\n\n👤 `{}`\n⏰ Subscription lapses within 24h",
                    email
                ))
                .await;
            }
            NotificationThreshold::SevenDays => {
                let days = NotificationThreshold::days_remaining(remaining);
                self.notify_customer(
                    email,
                    &format!(
                        "Your Crypto Analyzer Pro subscription expires in {} days. Renew at {} \
                         to avoid falling back to the free tier.",
                        days, self.dashboard_url
                    ),
                )
                .await;
            }
        }
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
}
