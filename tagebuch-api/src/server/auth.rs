use std::sync::Arc;
use tagebuch_common::{
    model::{
        Id,
        user::{UserMarker, Username},
    },
    password::{self, PasswordError},
    token::{AccessToken, TokenIssueError, TokenIssuer, TokenVerifyError},
};
use tagebuch_db::client::{DbClient, DbError};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("The username is already taken")]
    UsernameTaken,
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    TokenIssue(#[from] TokenIssueError),
    #[error(transparent)]
    Database(DbError),
}

impl From<DbError> for AuthError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::UniqueViolation => AuthError::UsernameTaken,
            other => AuthError::Database(other),
        }
    }
}

/// Outcome of a credential check. `token` is only present when `ok` is
/// true.
#[derive(Clone, Debug)]
pub struct Authentication {
    pub ok: bool,
    pub token: Option<AccessToken>,
}

impl Authentication {
    fn denied() -> Self {
        Self {
            ok: false,
            token: None,
        }
    }
}

#[derive(Clone)]
pub struct AuthService {
    db: Arc<DbClient>,
    tokens: Arc<TokenIssuer>,
}

impl AuthService {
    #[must_use]
    pub fn new(db: Arc<DbClient>, tokens: Arc<TokenIssuer>) -> Self {
        Self { db, tokens }
    }

    /// Creates a user with a freshly hashed password. A taken username
    /// reports `UsernameTaken`; the insert is transactional, so a failed
    /// registration leaves no row behind.
    pub async fn register(
        &self,
        username: &Username,
        password: &str,
    ) -> Result<Id<UserMarker>, AuthError> {
        let password_hash = password::hash_password(password)?;
        let id = self.db.create_user(username, &password_hash).await?;

        debug!(username = username.get(), %id, "Registered user");
        Ok(id)
    }

    /// Checks credentials and issues a 60 minute token on a match. An
    /// unknown username is an ordinary denial, not an error.
    pub async fn authenticate(
        &self,
        username: &Username,
        password: &str,
    ) -> Result<Authentication, AuthError> {
        let Some(user) = self.db.fetch_user_by_username(username).await? else {
            return Ok(Authentication::denied());
        };

        if !password::verify_password(password, &user.password_hash)? {
            return Ok(Authentication::denied());
        }

        let token = self.tokens.issue(username)?;
        Ok(Authentication {
            ok: true,
            token: Some(token),
        })
    }

    pub fn verify_token(&self, token: &str) -> Result<Username, TokenVerifyError> {
        self.tokens.verify(token)
    }
}
