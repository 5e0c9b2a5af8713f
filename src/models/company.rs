use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Which side of the marketplace a company trades on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Owns equipment and answers rental requests
    Provider,
    /// Rents equipment from providers
    User,
}

impl AccountType {
    /// Convert from database string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "provider" => Ok(AccountType::Provider),
            "user" => Ok(AccountType::User),
            _ => Err(format!("Invalid account type: {}", s)),
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Provider => "provider",
            AccountType::User => "user",
        }
    }
}

impl From<AccountType> for String {
    fn from(account_type: AccountType) -> Self {
        account_type.as_str().to_string()
    }
}

/// Company model, the unit that owns products, requests and offers
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub account_type: String, // Stored as TEXT, use AccountType enum for type safety
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    #[serde(skip_serializing)]
    pub stripe_customer_id: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Company {
    /// Get account type as an enum
    pub fn account_type_enum(&self) -> AccountType {
        AccountType::from_str(&self.account_type).unwrap_or(AccountType::User)
    }

    pub fn is_provider(&self) -> bool {
        self.account_type_enum() == AccountType::Provider
    }
}
