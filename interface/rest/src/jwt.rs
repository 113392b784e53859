//! Reads claims out of access tokens. Signatures are the server's business,
//! nothing here verifies them.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use huddle_interface::types::UserId;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ClaimsError {
    #[error("access token is not a JWT")]
    Malformed,
    #[error("access token payload is not base64url: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("access token payload has no usable user_id: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("user_id claim {0:?} is not a number")]
    UserId(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawUserId {
    Number(UserId),
    Text(String),
}

#[derive(Deserialize)]
struct Claims {
    user_id: RawUserId,
}

/// Id of the user the token was issued to.
pub fn user_id(token: &str) -> Result<UserId, ClaimsError> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ClaimsError::Malformed);
    };

    let payload = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    let claims: Claims = serde_json::from_slice(&payload)?;

    match claims.user_id {
        RawUserId::Number(id) => Ok(id),
        RawUserId::Text(text) => text.parse().map_err(|_| ClaimsError::UserId(text)),
    }
}
