use super::money::check_amount;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A catalog entry a provider can rent out
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub quantity: i32,
    pub daily_price: Option<Decimal>, // NUMERIC(12, 2) in database
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Product listing row joined with its provider's name
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProductListing {
    pub id: Uuid,
    pub company_id: Uuid,
    pub company_name: String,
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub quantity: i32,
    pub daily_price: Option<Decimal>,
}

/// Fields a provider supplies when creating or updating a product
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub quantity: i32,
    pub daily_price: Option<Decimal>,
}

impl ProductInput {
    /// Validate catalog values before they reach the database
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Product name is required".to_string());
        }
        if self.quantity < 0 {
            return Err("Quantity must not be negative".to_string());
        }
        if let Some(price) = self.daily_price {
            check_amount(price).map_err(|e| format!("Daily price {}", e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_input_validation() {
        let mut input = ProductInput {
            name: "Scissor lift 8m".to_string(),
            quantity: 3,
            daily_price: Some(Decimal::new(12500, 2)),
            ..ProductInput::default()
        };
        assert!(input.validate().is_ok());

        input.daily_price = Some(Decimal::new(-1, 0));
        assert!(input.validate().is_err());

        input.daily_price = Some(Decimal::new(99_999, 3));
        assert_eq!(
            input.validate().unwrap_err(),
            "Daily price must have at most 2 decimal places"
        );

        input.daily_price = None;
        input.name = "   ".to_string();
        assert!(input.validate().is_err());
    }
}
