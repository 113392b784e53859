use secure_string::SecureString;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Debug;

/// Unique identifier of a user on the remote service.
pub type UserId = u64;

/// Store key under which the access token is persisted.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Store key under which the refresh token is persisted.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
/// Store key under which the group code of the signed in user is persisted.
pub const GROUP_ID_KEY: &str = "groupId";

/// Represents an account as the remote service returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    /// Group the user belongs to. `None` when the user still has to join one.
    #[serde(default, deserialize_with = "optional_code")]
    pub group_id: Option<String>,
    /// Group the user administrates, if any.
    #[serde(default, deserialize_with = "optional_code")]
    pub admin_of: Option<String>,
}
impl User {
    /// Whether the user administrates a group.
    pub fn is_admin(&self) -> bool {
        self.admin_of.is_some()
    }
}

/// Represents a group and its moderation data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(deserialize_with = "code")]
    pub id: String,
    #[serde(default)]
    pub private: bool,
    /// Ids of users that are not allowed back into the group.
    #[serde(default)]
    pub users_blacklist: Vec<UserId>,
}

/// Token pair handed out by the login endpoint.
#[derive(Clone, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}
impl Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair").finish_non_exhaustive()
    }
}

/// Everything persisted about the signed in session.
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub access_token: SecureString,
    pub refresh_token: SecureString,
    pub group_id: Option<String>,
}

/// Where the presentation layer should go next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Route {
    Login,
    Home,
    EnterGroup,
    Group,
    EditProfile,
}

/// HTTP verbs the dispatcher knows how to issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// A fully resolved request, ready to be put on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}
impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Raw answer of the remote service.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Raw bytes, whatever encoding the server used.
    pub body: Vec<u8>,
}

// Codes come back as strings or numbers depending on the endpoint, an empty
// string means "no group".
#[derive(Deserialize)]
#[serde(untagged)]
enum RawCode {
    Text(String),
    Number(i64),
}
impl From<RawCode> for String {
    fn from(raw: RawCode) -> Self {
        match raw {
            RawCode::Text(text) => text,
            RawCode::Number(number) => number.to_string(),
        }
    }
}

fn optional_code<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw = Option::<RawCode>::deserialize(deserializer)?;
    Ok(raw.map(String::from).filter(|code| !code.is_empty()))
}

fn code<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    RawCode::deserialize(deserializer).map(String::from)
}
