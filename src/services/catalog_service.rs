use crate::auth::Claims;
use crate::catalog::{plan_import, ImportReport, ImportRow};
use crate::error::{AppError, AppResult, RepositoryError};
use crate::models::{AccountType, Company, Product, ProductInput, ProductListing};
use crate::repositories::{CompanyRepository, ProductRepository, ProductSearch};
use crate::services::AuditTrailService;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;
/// Highest page served; keeps `(page - 1) * per_page` inside `i64`
pub const MAX_PAGE: i64 = i64::MAX / MAX_PER_PAGE;
pub const MAX_IMPORT_ROWS: usize = 5_000;

/// Query string of the catalog search
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub provider_id: Option<Uuid>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductPage {
    pub items: Vec<ProductListing>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

/// Clamp pagination input: pages start at 1, both values are capped
pub fn page_bounds(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).clamp(1, MAX_PAGE);
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    (page, per_page)
}

/// Row offset of a page returned by `page_bounds`
pub fn page_offset(page: i64, per_page: i64) -> i64 {
    page.saturating_sub(1).saturating_mul(per_page)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Service for provider catalogs
pub struct CatalogService {
    pool: PgPool,
    product_repo: Arc<ProductRepository>,
    company_repo: Arc<CompanyRepository>,
    audit: Arc<AuditTrailService>,
    match_threshold: f64,
}

impl CatalogService {
    pub fn new(
        pool: PgPool,
        product_repo: Arc<ProductRepository>,
        company_repo: Arc<CompanyRepository>,
        audit: Arc<AuditTrailService>,
        match_threshold: f64,
    ) -> Self {
        Self {
            pool,
            product_repo,
            company_repo,
            audit,
            match_threshold,
        }
    }

    fn ensure_provider(actor: &Claims) -> AppResult<()> {
        if AccountType::from_str(&actor.account_type).ok() != Some(AccountType::Provider) {
            return Err(AppError::Forbidden(
                "Only provider companies manage a catalog".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn create_product(&self, actor: &Claims, input: ProductInput) -> AppResult<Product> {
        Self::ensure_provider(actor)?;
        input.validate().map_err(AppError::Validation)?;

        let product = self
            .product_repo
            .create(&self.pool, actor.company_id, &input)
            .await
            .map_err(RepositoryError::from)?;

        info!("Product {} created by company {}", product.id, actor.company_id);
        Ok(product)
    }

    /// Only the owning company may update; anyone else sees a 404
    pub async fn update_product(
        &self,
        actor: &Claims,
        product_id: Uuid,
        input: ProductInput,
    ) -> AppResult<Product> {
        Self::ensure_provider(actor)?;
        input.validate().map_err(AppError::Validation)?;

        self.product_repo
            .update(&self.pool, product_id, actor.company_id, &input)
            .await
            .map_err(RepositoryError::from)?
            .ok_or_else(|| AppError::NotFound(format!("Product {} not found", product_id)))
    }

    pub async fn delete_product(&self, actor: &Claims, product_id: Uuid) -> AppResult<()> {
        Self::ensure_provider(actor)?;
        if !self
            .product_repo
            .deactivate(product_id, actor.company_id)
            .await?
        {
            return Err(AppError::NotFound(format!("Product {} not found", product_id)));
        }
        info!("Product {} deactivated", product_id);
        Ok(())
    }

    /// Inactive products stay visible to their owner only
    pub async fn get_product(&self, actor: &Claims, product_id: Uuid) -> AppResult<Product> {
        let product = self
            .product_repo
            .find_by_id(product_id)
            .await?
            .filter(|p| p.is_active || p.company_id == actor.company_id)
            .ok_or_else(|| AppError::NotFound(format!("Product {} not found", product_id)))?;
        Ok(product)
    }

    pub async fn own_products(&self, actor: &Claims) -> AppResult<Vec<Product>> {
        Self::ensure_provider(actor)?;
        Ok(self.product_repo.find_by_company(actor.company_id).await?)
    }

    pub async fn search(&self, query: SearchQuery) -> AppResult<ProductPage> {
        let (page, per_page) = page_bounds(query.page, query.per_page);
        let search = ProductSearch {
            query: non_blank(query.q),
            category: non_blank(query.category),
            company_id: query.provider_id,
            limit: per_page,
            offset: page_offset(page, per_page),
        };

        let items = self.product_repo.search(&search).await?;
        let total = self.product_repo.count_search(&search).await?;

        Ok(ProductPage {
            items,
            page,
            per_page,
            total,
        })
    }

    pub async fn list_providers(&self) -> AppResult<Vec<Company>> {
        Ok(self.company_repo.list_active_providers().await?)
    }

    /// Import catalog rows in one transaction.
    ///
    /// The company's products are locked while the plan is computed and
    /// applied, so two concurrent imports can't both create the same item.
    pub async fn import_products(&self, actor: &Claims, rows: Vec<ImportRow>) -> AppResult<ImportReport> {
        Self::ensure_provider(actor)?;
        if rows.is_empty() {
            return Err(AppError::Validation("Import contains no rows".to_string()));
        }
        if rows.len() > MAX_IMPORT_ROWS {
            return Err(AppError::Validation(format!(
                "Import is limited to {} rows",
                MAX_IMPORT_ROWS
            )));
        }

        let mut tx = self.pool.begin().await?;
        let existing = self
            .product_repo
            .lock_by_company(&mut *tx, actor.company_id)
            .await?;

        let plan = plan_import(rows, &existing, self.match_threshold);

        for update in &plan.updates {
            let current = existing.iter().find(|p| p.id == update.product_id);
            let input = update.row.to_product_input(current);
            self.product_repo
                .update(&mut *tx, update.product_id, actor.company_id, &input)
                .await
                .map_err(RepositoryError::from)?;
        }

        for row in &plan.creates {
            let input = row.to_product_input(None);
            self.product_repo
                .create(&mut *tx, actor.company_id, &input)
                .await
                .map_err(RepositoryError::from)?;
        }

        tx.commit().await?;

        let report = plan.report();
        info!(
            "Catalog import for company {}: {} created, {} updated, {} merged, {} skipped",
            actor.company_id,
            report.created,
            report.updated,
            report.merged,
            report.skipped.len()
        );
        if let Err(e) = self.audit.log_catalog_import(actor.company_id, &report).await {
            warn!("Failed to audit catalog import: {}", e);
        }

        Ok(report)
    }
}
