use entity::users::{self, Role};
use platform_authn::{AuthConfig, hash_password, issue_token, verify_password};
use platform_db::Store;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{ServiceError, ServiceResult};
use crate::validate::{normalize_email, now};

pub const MIN_PASSWORD_CHARS: usize = 6;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: i32,
    pub email: String,
    pub role: Role,
    pub is_verified: bool,
    pub is_active: bool,
}

impl From<users::Model> for UserSummary {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
            is_verified: user.is_verified,
            is_active: user.is_active,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Clone, Debug)]
pub struct AccountService {
    store: Store,
    auth: AuthConfig,
}

impl AccountService {
    pub fn new(store: Store, auth: AuthConfig) -> Self {
        Self { store, auth }
    }

    async fn find_by_email(&self, email: &str) -> ServiceResult<Option<users::Model>> {
        let user = self
            .store
            .run(
                users::Entity::find()
                    .filter(users::Column::Email.eq(email))
                    .one(self.store.conn()),
            )
            .await?;
        Ok(user)
    }

    fn session(&self, user: users::Model) -> ServiceResult<AuthSession> {
        let token = issue_token(user.id, user.role.as_str(), &self.auth)
            .map_err(|err| ServiceError::Internal(err.into()))?;
        Ok(AuthSession {
            token,
            user: user.into(),
        })
    }

    #[instrument(skip_all)]
    pub async fn register(&self, input: Registration) -> ServiceResult<AuthSession> {
        let (Some(email), Some(password), Some(role)) = (
            input.email.filter(|v| !v.trim().is_empty()),
            input.password.filter(|v| !v.is_empty()),
            input.role.filter(|v| !v.trim().is_empty()),
        ) else {
            return Err(ServiceError::invalid(
                "Please provide email, password, and role",
            ));
        };
        let role =
            Role::parse(&role).ok_or_else(|| ServiceError::invalid("Role must be either tutor or student"))?;
        let email = normalize_email(&email)
            .ok_or_else(|| ServiceError::invalid("Please provide a valid email address"))?;
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(ServiceError::invalid(format!(
                "Password must be at least {MIN_PASSWORD_CHARS} characters"
            )));
        }
        if self.find_by_email(&email).await?.is_some() {
            return Err(ServiceError::invalid("User with this email already exists"));
        }

        let password_hash =
            hash_password(&password).map_err(|err| ServiceError::Internal(err.into()))?;
        let now = now();
        let model = users::ActiveModel {
            email: Set(email),
            password_hash: Set(password_hash),
            role: Set(role),
            is_active: Set(true),
            is_verified: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let user = match self.store.run(model.insert(self.store.conn())).await {
            Ok(user) => user,
            Err(err) if err.is_unique_violation() => {
                return Err(ServiceError::invalid("User with this email already exists"));
            }
            Err(err) => return Err(err.into()),
        };
        tracing::info!(user_id = user.id, role = user.role.as_str(), "user registered");
        self.session(user)
    }

    #[instrument(skip_all)]
    pub async fn login(&self, input: Credentials) -> ServiceResult<AuthSession> {
        let (Some(email), Some(password)) = (
            input.email.filter(|v| !v.trim().is_empty()),
            input.password.filter(|v| !v.is_empty()),
        ) else {
            return Err(ServiceError::invalid("Please provide email and password"));
        };
        let invalid = || ServiceError::Unauthenticated("Invalid credentials".into());
        let email = normalize_email(&email).ok_or_else(invalid)?;
        let user = self.find_by_email(&email).await?.ok_or_else(invalid)?;
        if !verify_password(&password, &user.password_hash) {
            return Err(invalid());
        }
        if !user.is_active {
            return Err(ServiceError::Unauthenticated("Account is deactivated".into()));
        }
        self.session(user)
    }

    pub async fn me(&self, user_id: i32) -> ServiceResult<UserSummary> {
        self.find(user_id)
            .await?
            .map(UserSummary::from)
            .ok_or_else(|| ServiceError::not_found("User not found"))
    }

    /// Loads a user by id; used by the request authenticator.
    pub async fn find(&self, user_id: i32) -> ServiceResult<Option<users::Model>> {
        let user = self
            .store
            .run(users::Entity::find_by_id(user_id).one(self.store.conn()))
            .await?;
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn set_active(&self, email: &str, active: bool) -> ServiceResult<UserSummary> {
        let email =
            normalize_email(email).ok_or_else(|| ServiceError::invalid("Invalid email address"))?;
        let result = self
            .store
            .run(
                users::Entity::update_many()
                    .col_expr(users::Column::IsActive, Expr::value(active))
                    .col_expr(users::Column::UpdatedAt, Expr::value(now()))
                    .filter(users::Column::Email.eq(email.as_str()))
                    .exec(self.store.conn()),
            )
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("User not found"));
        }
        tracing::info!(%email, active, "account status changed");
        self.find_by_email(&email)
            .await?
            .map(UserSummary::from)
            .ok_or_else(|| ServiceError::not_found("User not found"))
    }
}
