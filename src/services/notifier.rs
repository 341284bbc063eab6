//! Daily reminder task for overdue loans

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use tokio::time::sleep;

use crate::{
    config::LoanConfig,
    error::{AppError, AppResult},
    services::{email::MailSender, loans::LoansService},
};

/// Subject line of the reminder email
const OVERDUE_SUBJECT: &str = "Book with overdue loan";

/// Fires once per day at a configured wall-clock time (UTC): fetches the
/// late loans, collects the customer addresses and sends one batched
/// message. Cycles are strictly serial; a failed send is logged and the
/// schedule keeps going. Nothing records who was notified, so a customer is
/// reminded again the next day while the loan stays open.
pub struct OverdueNotifier {
    loans: LoansService,
    mailer: Arc<dyn MailSender>,
    config: LoanConfig,
    fire_at: NaiveTime,
}

impl OverdueNotifier {
    pub fn new(
        loans: LoansService,
        mailer: Arc<dyn MailSender>,
        config: LoanConfig,
    ) -> AppResult<Self> {
        let fire_at = NaiveTime::parse_from_str(&config.notice_time, "%H:%M:%S").map_err(|e| {
            AppError::Internal(format!(
                "Invalid loans.notice_time '{}': {}",
                config.notice_time, e
            ))
        })?;

        Ok(Self {
            loans,
            mailer,
            config,
            fire_at,
        })
    }

    /// Run one notification cycle, returning how many customers were notified
    pub async fn run_once(&self) -> AppResult<usize> {
        let late = self.loans.get_all_late_loans().await?;
        let recipients: Vec<String> = late.iter().map(|loan| loan.email.clone()).collect();

        if recipients.is_empty() {
            tracing::debug!("No late loans, nothing to notify");
            return Ok(0);
        }

        self.mailer
            .send_batch(OVERDUE_SUBJECT, &self.config.notice_message, &recipients)
            .await?;

        Ok(recipients.len())
    }

    /// Loop forever, firing once per day at the configured time
    pub async fn run(self) {
        loop {
            let delay = delay_until(Utc::now(), self.fire_at);
            tracing::debug!(
                seconds = delay.as_secs(),
                "Overdue notifier sleeping until next cycle"
            );
            sleep(delay).await;

            match self.run_once().await {
                Ok(notified) => {
                    tracing::info!(notified, "Overdue notification cycle complete");
                }
                Err(e) => {
                    tracing::warn!("Overdue notification cycle failed: {}", e);
                }
            }
        }
    }
}

/// Time left until the next occurrence of `fire_at`, seen from `now`.
/// Always strictly in the future: at exactly `fire_at` the next run is a
/// day away.
fn delay_until(now: DateTime<Utc>, fire_at: NaiveTime) -> StdDuration {
    let today = now.date_naive().and_time(fire_at).and_utc();
    let next = if today > now {
        today
    } else {
        today + Duration::days(1)
    };

    (next - now).to_std().unwrap_or_default()
}
