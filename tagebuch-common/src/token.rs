use crate::model::user::Username;
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
    get_current_timestamp,
};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use thiserror::Error;
use time::Duration;

/// Tokens expire 60 minutes after issuance.
pub const TOKEN_TTL: Duration = Duration::minutes(60);

/// Signed bearer token as handed to and received from clients.
#[derive(Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Debug for AccessToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AccessToken").field(&"[redacted]").finish()
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,
    exp: u64,
}

#[derive(Debug, Error)]
#[error("Signing token failed: {0}")]
pub struct TokenIssueError(#[from] jsonwebtoken::errors::Error);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum TokenVerifyError {
    #[error("The token signature or format is invalid")]
    InvalidToken,
    #[error("The token is expired")]
    Expired,
    #[error("The token carries no user claim")]
    MissingClaim,
}

/// Issues and verifies the HS256-signed access tokens carrying a `user`
/// claim and the standard `exp` claim.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::default();
        // Default leeway would let tokens outlive their exact 60 minute
        // window.
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn issue(&self, username: &Username) -> Result<AccessToken, TokenIssueError> {
        let claims = Claims {
            user: Some(username.get().to_owned()),
            exp: get_current_timestamp() + TOKEN_TTL.whole_seconds().unsigned_abs(),
        };

        self.sign(&claims)
    }

    pub fn verify(&self, token: &str) -> Result<Username, TokenVerifyError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |err| match err.kind() {
                ErrorKind::ExpiredSignature => TokenVerifyError::Expired,
                _ => TokenVerifyError::InvalidToken,
            },
        )?;

        let username = token_data.claims.user.ok_or(TokenVerifyError::MissingClaim)?;
        Username::new(username).map_err(|_| TokenVerifyError::InvalidToken)
    }

    fn sign(&self, claims: &Claims) -> Result<AccessToken, TokenIssueError> {
        let token = encode(&Header::default(), claims, &self.encoding_key)?;
        Ok(AccessToken(token))
    }
}
