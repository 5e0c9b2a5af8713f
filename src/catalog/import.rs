//! Planning step of a catalog import.
//!
//! Rows are validated, merged with near-duplicates inside the same batch and
//! matched against the provider's existing catalog. The resulting plan is
//! applied by `CatalogService` inside a single transaction.

use super::matcher::best_match;
use crate::models::{check_amount, Product, ProductInput};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row of an uploaded catalog sheet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportRow {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub daily_price: Option<Decimal>,
}

/// Row that was left out, with a 1-based row number for the uploader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRow {
    pub row: usize,
    pub reason: String,
}

/// Existing product that an import row will overwrite
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedUpdate {
    pub product_id: Uuid,
    pub row: ImportRow,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportPlan {
    pub creates: Vec<ImportRow>,
    pub updates: Vec<PlannedUpdate>,
    /// Rows folded into an earlier row of the same batch
    pub merged: usize,
    pub skipped: Vec<SkippedRow>,
}

/// Counts reported back to the uploader
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub created: usize,
    pub updated: usize,
    pub merged: usize,
    pub skipped: Vec<SkippedRow>,
}

impl ImportRow {
    /// Values to write for this row. An existing product keeps its name and
    /// any field the row leaves empty; the quantity is always replaced.
    pub fn to_product_input(&self, current: Option<&Product>) -> ProductInput {
        match current {
            Some(product) => ProductInput {
                name: product.name.clone(),
                category: self.category.clone().or_else(|| product.category.clone()),
                description: self
                    .description
                    .clone()
                    .or_else(|| product.description.clone()),
                quantity: self.quantity,
                daily_price: self.daily_price.or(product.daily_price),
            },
            None => ProductInput {
                name: self.name.clone(),
                category: self.category.clone(),
                description: self.description.clone(),
                quantity: self.quantity,
                daily_price: self.daily_price,
            },
        }
    }
}

impl ImportPlan {
    pub fn report(&self) -> ImportReport {
        ImportReport {
            created: self.creates.len(),
            updated: self.updates.len(),
            merged: self.merged,
            skipped: self.skipped.clone(),
        }
    }
}

fn validate_row(row: &ImportRow) -> Result<(), String> {
    if row.name.trim().is_empty() {
        return Err("missing product name".to_string());
    }
    if row.quantity < 0 {
        return Err(format!("negative quantity {}", row.quantity));
    }
    if let Some(price) = row.daily_price {
        check_amount(price).map_err(|e| format!("daily price {} {}", price, e))?;
    }
    Ok(())
}

/// Later rows fill gaps in the earlier one; quantities add up.
///
/// Leaves `target` untouched when the combined quantity would overflow.
fn merge_into(target: &mut ImportRow, other: ImportRow) -> Result<(), String> {
    target.quantity = target
        .quantity
        .checked_add(other.quantity)
        .ok_or_else(|| format!("quantity {} overflows the merged total", other.quantity))?;
    if target.category.is_none() {
        target.category = other.category;
    }
    if target.description.is_none() {
        target.description = other.description;
    }
    if other.daily_price.is_some() {
        target.daily_price = other.daily_price;
    }
    Ok(())
}

pub fn plan_import(rows: Vec<ImportRow>, existing: &[Product], threshold: f64) -> ImportPlan {
    let mut plan = ImportPlan::default();
    let mut batch: Vec<ImportRow> = Vec::new();

    for (idx, mut row) in rows.into_iter().enumerate() {
        if let Err(reason) = validate_row(&row) {
            plan.skipped.push(SkippedRow {
                row: idx + 1,
                reason,
            });
            continue;
        }
        row.name = row.name.trim().to_string();

        let found = best_match(&row.name, batch.iter().map(|r| r.name.as_str()), threshold);
        match found {
            Some((pos, _)) => match merge_into(&mut batch[pos], row) {
                Ok(()) => plan.merged += 1,
                Err(reason) => plan.skipped.push(SkippedRow {
                    row: idx + 1,
                    reason,
                }),
            },
            None => batch.push(row),
        }
    }

    let mut claimed: Vec<Uuid> = Vec::new();
    for row in batch {
        let available: Vec<&Product> = existing
            .iter()
            .filter(|p| !claimed.contains(&p.id))
            .collect();
        let found = best_match(&row.name, available.iter().map(|p| p.name.as_str()), threshold);
        match found {
            Some((pos, _)) => {
                let product_id = available[pos].id;
                claimed.push(product_id);
                plan.updates.push(PlannedUpdate { product_id, row });
            }
            None => plan.creates.push(row),
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::matcher::DEFAULT_MATCH_THRESHOLD;
    use chrono::Utc;

    fn row(name: &str, quantity: i32) -> ImportRow {
        ImportRow {
            name: name.to_string(),
            quantity,
            ..ImportRow::default()
        }
    }

    fn product(name: &str) -> Product {
        let now = Utc::now().naive_utc();
        Product {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            name: name.to_string(),
            category: None,
            description: None,
            quantity: 1,
            daily_price: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_invalid_rows_are_skipped_with_row_numbers() {
        let rows = vec![row("Forklift 3t", 2), row("  ", 1), row("Light tower", -4)];
        let plan = plan_import(rows, &[], DEFAULT_MATCH_THRESHOLD);

        assert_eq!(plan.creates.len(), 1);
        assert_eq!(plan.skipped.len(), 2);
        assert_eq!(plan.skipped[0].row, 2);
        assert_eq!(plan.skipped[1].row, 3);
    }

    #[test]
    fn test_prices_the_catalog_cannot_store_are_skipped() {
        let mut precise = row("Uplighter", 12);
        precise.daily_price = Some(Decimal::new(12_345, 3));
        let plan = plan_import(vec![precise], &[], DEFAULT_MATCH_THRESHOLD);

        assert!(plan.creates.is_empty());
        assert!(plan.skipped[0].reason.contains("decimal places"));
    }

    #[test]
    fn test_duplicates_within_batch_are_merged() {
        let mut priced = row("forklift-3t", 1);
        priced.daily_price = Some(Decimal::new(9000, 2));
        let rows = vec![row("Forklift 3t", 2), priced, row("Light tower", 1)];

        let plan = plan_import(rows, &[], DEFAULT_MATCH_THRESHOLD);

        assert_eq!(plan.merged, 1);
        assert_eq!(plan.creates.len(), 2);
        assert_eq!(plan.creates[0].quantity, 3);
        assert_eq!(plan.creates[0].daily_price, Some(Decimal::new(9000, 2)));
    }

    #[test]
    fn test_merge_that_would_overflow_skips_the_row() {
        let rows = vec![row("Forklift 3t", i32::MAX), row("forklift 3t", 1)];
        let plan = plan_import(rows, &[], DEFAULT_MATCH_THRESHOLD);

        assert_eq!(plan.merged, 0);
        assert_eq!(plan.creates.len(), 1);
        assert_eq!(plan.creates[0].quantity, i32::MAX);
        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.skipped[0].row, 2);
        assert!(plan.skipped[0].reason.contains("overflows"));
    }

    #[test]
    fn test_existing_products_are_updated_once() {
        let existing = vec![product("Scissor Lift 8m"), product("Generator 20 kVA")];
        let rows = vec![row("scissor lift 8m", 5), row("Boom lift 16m", 2)];

        let plan = plan_import(rows, &existing, DEFAULT_MATCH_THRESHOLD);

        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].product_id, existing[0].id);
        assert_eq!(plan.updates[0].row.quantity, 5);
        assert_eq!(plan.creates.len(), 1);

        let report = plan.report();
        assert_eq!((report.created, report.updated, report.merged), (1, 1, 0));
    }

    #[test]
    fn test_inactive_products_are_matched_for_reactivation() {
        let mut retired = product("Light Tower 4x1000W");
        retired.is_active = false;
        let existing = vec![retired];

        let plan = plan_import(vec![row("light tower 4x1000w", 3)], &existing, DEFAULT_MATCH_THRESHOLD);

        assert!(plan.creates.is_empty());
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].product_id, existing[0].id);
    }

    #[test]
    fn test_update_keeps_existing_fields_the_row_leaves_empty() {
        let mut current = product("Scissor Lift 8m");
        current.category = Some("Access".to_string());
        current.daily_price = Some(Decimal::new(11000, 2));

        let mut incoming = row("scissor lift 8m", 7);
        incoming.description = Some("Electric, indoor".to_string());

        let input = incoming.to_product_input(Some(&current));
        assert_eq!(input.name, "Scissor Lift 8m");
        assert_eq!(input.quantity, 7);
        assert_eq!(input.category.as_deref(), Some("Access"));
        assert_eq!(input.description.as_deref(), Some("Electric, indoor"));
        assert_eq!(input.daily_price, Some(Decimal::new(11000, 2)));
    }
}
