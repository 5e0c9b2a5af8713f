use crate::catalog::ImportReport;
use crate::error::{AppError, AppResult};
use crate::models::{JobOffer, JobRating, SupplyJob};
use crate::negotiation::Allocation;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub timestamp: i64,
    pub event_type: String, // "offer_sent", "handshake", "negotiation_cancelled", etc.
    pub rental_job_id: Option<Uuid>,
    pub actor_company_id: Option<Uuid>,
    pub details: serde_json::Value,
}

impl AuditLogEntry {
    fn now(
        event_type: &str,
        rental_job_id: Option<Uuid>,
        actor_company_id: Option<Uuid>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp(),
            event_type: event_type.to_string(),
            rental_job_id,
            actor_company_id,
            details,
        }
    }
}

/// Append-only JSON-lines trail of negotiation events, one file per UTC day
pub struct AuditTrailService {
    log_directory: PathBuf,
    write_lock: Mutex<()>,
}

impl AuditTrailService {
    /// Create a new audit trail service
    pub fn new(log_directory: PathBuf) -> AppResult<Self> {
        // Ensure directory exists
        std::fs::create_dir_all(&log_directory)
            .map_err(|e| AppError::Message(format!("Failed to create log directory: {}", e)))?;

        info!("Audit trail initialized: {:?}", log_directory);

        Ok(Self {
            log_directory,
            write_lock: Mutex::new(()),
        })
    }

    pub fn log_directory(&self) -> &Path {
        &self.log_directory
    }

    /// File the entries of today go to
    pub fn current_file(&self) -> PathBuf {
        let date = chrono::Utc::now().format("%Y-%m-%d");
        self.log_directory.join(format!("audit_{}.log", date))
    }

    /// Log an audit entry
    pub async fn log(&self, entry: AuditLogEntry) -> AppResult<()> {
        let json = serde_json::to_string(&entry)?;

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.current_file())
            .map_err(|e| AppError::Message(format!("Failed to open audit log file: {}", e)))?;

        writeln!(file, "{}", json)
            .map_err(|e| AppError::Message(format!("Failed to write audit log: {}", e)))?;

        file.flush()
            .map_err(|e| AppError::Message(format!("Failed to flush audit log: {}", e)))?;

        Ok(())
    }

    /// Log a new offer version
    pub async fn log_offer_sent(&self, offer: &JobOffer) -> AppResult<()> {
        self.log(AuditLogEntry::now(
            "offer_sent",
            Some(offer.rental_job_id),
            Some(offer.sender_company_id),
            serde_json::json!({
                "supply_job_id": offer.supply_job_id.to_string(),
                "offer_id": offer.id.to_string(),
                "version": offer.version,
                "price": offer.price.to_string(),
                "receiver_company_id": offer.receiver_company_id.to_string(),
            }),
        ))
        .await
    }

    /// Log an accepted handshake with the quantities it locked in
    pub async fn log_handshake(
        &self,
        supply_job: &SupplyJob,
        offer: &JobOffer,
        actor: Uuid,
        allocations: &[Allocation],
    ) -> AppResult<()> {
        let lines: Vec<serde_json::Value> = allocations
            .iter()
            .map(|a| {
                serde_json::json!({
                    "rental_job_product_id": a.rental_line_id.to_string(),
                    "quantity": a.take,
                })
            })
            .collect();

        self.log(AuditLogEntry::now(
            "handshake",
            Some(supply_job.rental_job_id),
            Some(actor),
            serde_json::json!({
                "supply_job_id": supply_job.id.to_string(),
                "offer_version": offer.version,
                "price": offer.price.to_string(),
                "lines": lines,
            }),
        ))
        .await
    }

    /// Log a supply job leaving the negotiation
    pub async fn log_negotiation_cancelled(
        &self,
        supply_job: &SupplyJob,
        actor: Uuid,
        reason: Option<&str>,
    ) -> AppResult<()> {
        self.log(AuditLogEntry::now(
            "negotiation_cancelled",
            Some(supply_job.rental_job_id),
            Some(actor),
            serde_json::json!({
                "supply_job_id": supply_job.id.to_string(),
                "reason": reason,
            }),
        ))
        .await
    }

    /// Log a supply job status step after the handshake (started, completed)
    pub async fn log_supply_job_status(&self, supply_job: &SupplyJob, actor: Uuid) -> AppResult<()> {
        self.log(AuditLogEntry::now(
            "supply_job_status",
            Some(supply_job.rental_job_id),
            Some(actor),
            serde_json::json!({
                "supply_job_id": supply_job.id.to_string(),
                "status": supply_job.status,
            }),
        ))
        .await
    }

    /// Log a renter withdrawing a whole request
    pub async fn log_rental_job_cancelled(&self, rental_job_id: Uuid, actor: Uuid) -> AppResult<()> {
        self.log(AuditLogEntry::now(
            "rental_job_cancelled",
            Some(rental_job_id),
            Some(actor),
            serde_json::json!({}),
        ))
        .await
    }

    /// Log a rating
    pub async fn log_rating(&self, rating: &JobRating) -> AppResult<()> {
        self.log(AuditLogEntry::now(
            "job_rated",
            None,
            Some(rating.rater_company_id),
            serde_json::json!({
                "supply_job_id": rating.supply_job_id.to_string(),
                "rated_company_id": rating.rated_company_id.to_string(),
                "score": rating.score,
            }),
        ))
        .await
    }

    /// Log the outcome of a catalog import
    pub async fn log_catalog_import(&self, company_id: Uuid, report: &ImportReport) -> AppResult<()> {
        self.log(AuditLogEntry::now(
            "catalog_import",
            None,
            Some(company_id),
            serde_json::json!({
                "created": report.created,
                "updated": report.updated,
                "merged": report.merged,
                "skipped": report.skipped.len(),
            }),
        ))
        .await
    }
}
