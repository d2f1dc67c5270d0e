use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::jwt::IssuedToken;
use crate::auth::password::{hash_password, verify_password, PasswordPolicy};
use crate::auth::{
    AuthError, AuthResponse, JwtService, LoginRequest, MessageResponse, RefreshTokenRequest,
    RegisterRequest, TokenResponse, TokenType, UserInfo, UserSession, BEARER,
};
use crate::config::AppConfig;
use crate::models::{validate_email, validate_full_name, User};

const USER_COLUMNS: &str = "id, email, password_hash, full_name, created_at, updated_at";

/// Accounts, token issuance and revocation
#[derive(Debug, Clone)]
pub struct AuthService {
    jwt: JwtService,
    policy: PasswordPolicy,
    db: SqlitePool,
}

impl AuthService {
    pub fn new(db: SqlitePool, config: &AppConfig) -> Self {
        Self {
            jwt: JwtService::new(
                &config.jwt_secret,
                config.access_token_expire_minutes,
                config.refresh_token_expire_days,
            ),
            policy: PasswordPolicy::default(),
            db,
        }
    }

    fn check_registration(&self, email: &str, request: &RegisterRequest) -> Result<(), AuthError> {
        let mut problems: Vec<String> = [validate_email(email), validate_full_name(&request.full_name)]
            .into_iter()
            .filter_map(Result::err)
            .collect();
        problems.extend(self.policy.violations(&request.password).iter().map(ToString::to_string));

        if problems.is_empty() {
            Ok(())
        } else {
            Err(AuthError::Validation(problems))
        }
    }

    #[tracing::instrument(skip_all, fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AuthError> {
        let email = request.email.trim().to_lowercase();
        self.check_registration(&email, &request)?;

        if self.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailAlreadyExists);
        }

        let password = request.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AuthError::Internal(e.into()))??;

        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email, password_hash, full_name, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(&password_hash)
        .bind(request.full_name.trim())
        .bind(now)
        .bind(now)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(user_id = %user.id, "Account created");
        self.start_session(user).await
    }

    #[tracing::instrument(skip_all, fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        let email = request.email.trim().to_lowercase();
        let Some(user) = self.find_by_email(&email).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        let password = request.password;
        let stored_hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
            .await
            .map_err(|e| AuthError::Internal(e.into()))??;

        if !matches {
            tracing::warn!(user_id = %user.id, "Rejected login");
            return Err(AuthError::InvalidCredentials);
        }

        self.start_session(user).await
    }

    /// New access token for a stored, unrevoked refresh token.
    pub async fn refresh_token(&self, request: RefreshTokenRequest) -> Result<TokenResponse, AuthError> {
        let claims = self.jwt.verify(&request.refresh_token, TokenType::Refresh)?;

        let stored = sqlx::query(
            "SELECT 1 FROM refresh_tokens
             WHERE user_id = ? AND token_hash = ? AND expires_at > ? AND revoked = 0",
        )
        .bind(claims.sub)
        .bind(fingerprint(&request.refresh_token))
        .bind(Utc::now())
        .fetch_optional(&self.db)
        .await?;
        if stored.is_none() {
            return Err(AuthError::InvalidToken);
        }

        let access = self.jwt.issue(claims.sub, &claims.email, TokenType::Access)?;
        Ok(TokenResponse {
            access_token: access.token,
            token_type: BEARER,
            expires_in: self.jwt.access_ttl_seconds(),
        })
    }

    #[tracing::instrument(skip_all, fields(user_id = %session.user_id))]
    pub async fn logout(&self, session: &UserSession) -> Result<MessageResponse, AuthError> {
        let expires_at = DateTime::<Utc>::from_timestamp(session.expires_at, 0).ok_or(AuthError::InvalidToken)?;

        let mut tx = self.db.begin().await?;
        sqlx::query(
            "INSERT INTO token_blacklist (jti, expires_at, created_at) VALUES (?, ?, ?)
             ON CONFLICT (jti) DO NOTHING",
        )
        .bind(&session.jti)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE user_id = ?")
            .bind(session.user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        self.purge_expired_tokens().await?;

        tracing::info!("Session ended");
        Ok(MessageResponse {
            message: "Successfully logged out".to_string(),
        })
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<UserInfo, AuthError> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .map(UserInfo::from)
            .ok_or(AuthError::UserNotFound)
    }

    /// Session for a bearer token that is valid and not logged out.
    pub async fn validate_session(&self, token: &str) -> Result<UserSession, AuthError> {
        let session = self.jwt.session(token)?;

        let revoked = sqlx::query("SELECT 1 FROM token_blacklist WHERE jti = ? AND expires_at > ?")
            .bind(&session.jti)
            .bind(Utc::now())
            .fetch_optional(&self.db)
            .await?;

        match revoked {
            Some(_) => Err(AuthError::InvalidToken),
            None => Ok(session),
        }
    }

    /// Drops blacklist entries and refresh tokens that can no longer be presented.
    pub async fn purge_expired_tokens(&self) -> Result<u64, AuthError> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let blacklisted = sqlx::query("DELETE FROM token_blacklist WHERE expires_at <= ?")
            .bind(now)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let refresh = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= ? OR revoked = 1")
            .bind(now)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        if blacklisted + refresh > 0 {
            tracing::debug!(blacklisted, refresh, "Purged expired tokens");
        }
        Ok(blacklisted + refresh)
    }

    async fn start_session(&self, user: User) -> Result<AuthResponse, AuthError> {
        self.purge_expired_tokens().await?;

        let access = self.jwt.issue(user.id, &user.email, TokenType::Access)?;
        let refresh = self.jwt.issue(user.id, &user.email, TokenType::Refresh)?;
        self.store_refresh_token(user.id, &refresh).await?;

        Ok(AuthResponse {
            access_token: access.token,
            refresh_token: refresh.token,
            token_type: BEARER,
            expires_in: self.jwt.access_ttl_seconds(),
            user: user.into(),
        })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
                .bind(email)
                .fetch_optional(&self.db)
                .await?,
        )
    }

    async fn store_refresh_token(&self, user_id: Uuid, refresh: &IssuedToken) -> Result<(), AuthError> {
        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, revoked, created_at)
             VALUES (?, ?, ?, ?, 0, ?)",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(fingerprint(&refresh.token))
        .bind(refresh.expires_at)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

/// Refresh tokens are stored as digests, never in clear.
fn fingerprint(token: &str) -> String {
    format!("{:x}", md5::compute(token))
}
