use crate::auth::{self, Claims};
use crate::config::AuthConfig;
use crate::error::{AppError, AppResult, RepositoryError};
use crate::models::{AccountType, Company, User, UserRole};
use crate::repositories::{CompanyRepository, UserRepository};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Sign-up form: a new company and its first user
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub company_name: String,
    pub account_type: AccountType,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Additional user for an existing company
#[derive(Debug, Clone, Deserialize)]
pub struct NewMemberRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Issued token plus who it belongs to
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub expires_at: i64,
    pub user: User,
    pub company: Company,
}

/// Trimmed, lowercased email used for storage and lookups
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> AppResult<String> {
    let email = normalize_email(email);
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !email.contains(' '),
        None => false,
    };
    if !valid {
        return Err(AppError::Validation(format!("Invalid email address: {}", email)));
    }
    Ok(email)
}

fn required(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

/// Service for accounts and access tokens
pub struct AuthService {
    pool: PgPool,
    company_repo: Arc<CompanyRepository>,
    user_repo: Arc<UserRepository>,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(
        pool: PgPool,
        company_repo: Arc<CompanyRepository>,
        user_repo: Arc<UserRepository>,
        config: AuthConfig,
    ) -> Self {
        Self {
            pool,
            company_repo,
            user_repo,
            config,
        }
    }

    /// Register a company together with its first user, who becomes its admin
    pub async fn register(&self, req: RegisterRequest) -> AppResult<AuthSession> {
        required("Company name", &req.company_name)?;
        required("Name", &req.name)?;
        let email = validate_email(&req.email)?;
        auth::validate_password(&req.password)?;

        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Email {} is already registered",
                email
            )));
        }

        let password_hash = auth::hash_password(&req.password)?;

        let mut tx = self.pool.begin().await?;
        let company = self
            .company_repo
            .create(
                &mut *tx,
                req.company_name.trim(),
                req.account_type,
                req.email.trim(),
                req.phone.as_deref(),
                req.address.as_deref(),
            )
            .await
            .map_err(RepositoryError::from)?;
        let user = self
            .user_repo
            .create(
                &mut *tx,
                company.id,
                req.name.trim(),
                &email,
                &password_hash,
                UserRole::Admin,
            )
            .await
            .map_err(RepositoryError::from)?;
        tx.commit().await?;

        info!(
            "Registered {} company {} ({}) with admin {}",
            company.account_type, company.name, company.id, user.id
        );

        self.issue_session(user, company)
    }

    /// Exchange email and password for a token
    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthSession> {
        let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

        let user = self
            .user_repo
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or_else(invalid)?;

        if !auth::verify_password(password, &user.password_hash) {
            warn!("Failed login for user {}", user.id);
            return Err(invalid());
        }

        let company = self
            .company_repo
            .find_by_id(user.company_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Company {} not found", user.company_id)))?;

        if !company.is_active {
            return Err(AppError::Forbidden(format!(
                "Company {} has been deactivated",
                company.name
            )));
        }

        self.issue_session(user, company)
    }

    /// Company admins may add members to their own company
    pub async fn add_member(&self, actor: &Claims, req: NewMemberRequest) -> AppResult<User> {
        if UserRole::from_str(&actor.role).ok() != Some(UserRole::Admin) {
            return Err(AppError::Forbidden(
                "Only company admins can add members".to_string(),
            ));
        }
        required("Name", &req.name)?;
        let email = validate_email(&req.email)?;
        auth::validate_password(&req.password)?;

        let password_hash = auth::hash_password(&req.password)?;
        let user = self
            .user_repo
            .create(
                &self.pool,
                actor.company_id,
                req.name.trim(),
                &email,
                &password_hash,
                UserRole::Member,
            )
            .await
            .map_err(RepositoryError::from)?;

        info!("User {} added to company {}", user.id, actor.company_id);
        Ok(user)
    }

    /// The caller's own user and company
    pub async fn me(&self, user_id: Uuid) -> AppResult<(User, Company)> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;
        let company = self
            .company_repo
            .find_by_id(user.company_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Company {} not found", user.company_id)))?;
        Ok((user, company))
    }

    /// Members of the caller's company
    pub async fn members(&self, company_id: Uuid) -> AppResult<Vec<User>> {
        Ok(self.user_repo.find_by_company(company_id).await?)
    }

    fn issue_session(&self, user: User, company: Company) -> AppResult<AuthSession> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims::for_user(&user, &company, &self.config, now);
        let token = auth::issue_token(&claims, &self.config.jwt_secret)?;

        Ok(AuthSession {
            token,
            expires_at: claims.exp,
            user,
            company,
        })
    }
}
