use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    TokenExpired,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("JWT error: {0}")]
    Jwt(jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::TokenExpired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            _ => Self::Jwt(err),
        }
    }
}

/// Authenticated user, inserted into request extensions by [`require_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub Uuid);

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

pub fn validate_jwt(token: &str, secret: &str) -> Result<Uuid, AuthError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.validate_nbf = true;
    // Tokens issued by the auth provider carry an audience we do not pin.
    validation.validate_aud = false;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)?;

    Uuid::parse_str(&token_data.claims.sub).map_err(|_| AuthError::InvalidToken)
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request).ok_or(AuthError::MissingToken)?;
    let user_id = validate_jwt(token, &state.jwt_secret)?;

    request.extensions_mut().insert(UserId(user_id));
    Ok(next.run(request).await)
}

#[cfg(test)]
pub(crate) fn issue_token(user_id: Uuid, secret: &str, ttl_secs: i64) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let exp = chrono::Utc::now().timestamp() + ttl_secs;
    encode(
        &Header::default(),
        &Claims {
            sub: user_id.to_string(),
            exp: exp.max(0) as usize,
        },
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("token encoding")
}
