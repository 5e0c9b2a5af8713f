//! Transactional email.
//!
//! Messages are rendered from askama templates and handed to a
//! `MailTransport`. The default transport appends one JSON line per message
//! to a dated outbox file that the SMTP relay drains. Delivery problems are
//! logged and swallowed so they never roll back a negotiation step.

use crate::config::MailConfig;
use crate::models::{Company, JobOffer, RentalJob, RentalJobProduct};
use crate::templates::{
    HandshakeConfirmedEmail, JobCompletedEmail, NegotiationCancelledEmail, OfferReceivedEmail,
    RentalRequestEmail,
};
use askama::Template;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Outbox I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub queued_at: i64,
}

/// Where rendered messages go
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

/// Appends messages to `<dir>/outbox_<date>.jsonl`
pub struct OutboxTransport {
    dir: PathBuf,
    // Serializes appends so concurrent lines never interleave
    write_lock: Mutex<()>,
}

impl OutboxTransport {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            write_lock: Mutex::new(()),
        }
    }

    fn current_file(&self) -> PathBuf {
        let date = chrono::Utc::now().format("%Y-%m-%d");
        self.dir.join(format!("outbox_{}.jsonl", date))
    }
}

#[async_trait]
impl MailTransport for OutboxTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let mut line = serde_json::to_string(email)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        tokio::fs::create_dir_all(&self.dir).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.current_file())
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

fn format_lines(lines: &[(String, i32)]) -> Vec<String> {
    lines
        .iter()
        .filter(|(_, qty)| *qty > 0)
        .map(|(name, qty)| format!("{} x {}", qty, name))
        .collect()
}

/// Renders and dispatches marketplace notifications
pub struct Notifier {
    transport: Arc<dyn MailTransport>,
    from: String,
}

impl Notifier {
    pub fn new(transport: Arc<dyn MailTransport>, from: String) -> Self {
        Self { transport, from }
    }

    /// Notifier backed by the outbox file configured in `config`
    pub fn from_config(config: &MailConfig) -> Self {
        Self::new(
            Arc::new(OutboxTransport::new(config.outbox_dir.clone())),
            config.from_address.clone(),
        )
    }

    async fn deliver<T: Template + Send + Sync>(&self, to: &str, subject: String, template: T) {
        let result = async {
            let email = OutgoingEmail {
                from: self.from.clone(),
                to: to.to_string(),
                subject,
                body: template.render()?,
                queued_at: chrono::Utc::now().timestamp(),
            };
            self.transport.send(&email).await?;
            Ok::<_, MailError>(email.subject)
        }
        .await;

        match result {
            Ok(subject) => debug!(to = %to, subject = %subject, "email queued"),
            Err(e) => warn!(to = %to, error = %e, "failed to queue email"),
        }
    }

    pub async fn rental_request_received(
        &self,
        provider: &Company,
        renter: &Company,
        rental_job: &RentalJob,
        lines: &[RentalJobProduct],
        opening_price: Option<Decimal>,
    ) {
        let lines: Vec<(String, i32)> = lines
            .iter()
            .map(|l| (l.name.clone(), l.requested_quantity))
            .collect();
        let template = RentalRequestEmail {
            provider_name: provider.name.clone(),
            renter_name: renter.name.clone(),
            job_title: rental_job.title.clone(),
            start_date: rental_job.start_date.to_string(),
            end_date: rental_job.end_date.to_string(),
            lines: format_lines(&lines),
            has_price: opening_price.is_some(),
            price: opening_price.map(|p| p.to_string()).unwrap_or_default(),
        };
        let subject = format!("New rental request: {}", rental_job.title);
        self.deliver(&provider.email, subject, template).await;
    }

    pub async fn offer_received(
        &self,
        receiver: &Company,
        sender: &Company,
        rental_job: &RentalJob,
        offer: &JobOffer,
    ) {
        let template = OfferReceivedEmail {
            receiver_name: receiver.name.clone(),
            sender_name: sender.name.clone(),
            job_title: rental_job.title.clone(),
            version: offer.version,
            price: offer.price.to_string(),
            notes: offer.notes.clone().unwrap_or_default(),
        };
        let subject = format!("Offer v{} on {}", offer.version, rental_job.title);
        self.deliver(&receiver.email, subject, template).await;
    }

    /// Both companies get a confirmation naming the other one
    pub async fn handshake_confirmed(
        &self,
        renter: &Company,
        provider: &Company,
        rental_job: &RentalJob,
        price: Decimal,
        committed: &[(String, i32)],
    ) {
        for (company, counterparty) in [(renter, provider), (provider, renter)] {
            let template = HandshakeConfirmedEmail {
                company_name: company.name.clone(),
                counterparty_name: counterparty.name.clone(),
                job_title: rental_job.title.clone(),
                price: price.to_string(),
                lines: format_lines(committed),
            };
            let subject = format!("Handshake confirmed: {}", rental_job.title);
            self.deliver(&company.email, subject, template).await;
        }
    }

    pub async fn negotiation_cancelled(
        &self,
        recipient: &Company,
        cancelled_by: &Company,
        rental_job: &RentalJob,
        reason: Option<&str>,
    ) {
        let template = NegotiationCancelledEmail {
            company_name: recipient.name.clone(),
            counterparty_name: cancelled_by.name.clone(),
            job_title: rental_job.title.clone(),
            reason: reason.unwrap_or_default().to_string(),
        };
        let subject = format!("Negotiation cancelled: {}", rental_job.title);
        self.deliver(&recipient.email, subject, template).await;
    }

    pub async fn job_completed(&self, provider: &Company, renter: &Company, rental_job: &RentalJob) {
        let template = JobCompletedEmail {
            company_name: provider.name.clone(),
            renter_name: renter.name.clone(),
            job_title: rental_job.title.clone(),
        };
        let subject = format!("Job completed: {}", rental_job.title);
        self.deliver(&provider.email, subject, template).await;
    }
}
