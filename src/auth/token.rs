use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// OAuth credential held by a credential store.
///
/// # Example
/// ```no_run
/// use decanter::auth::AccessCredential;
///
/// let credential = AccessCredential {
///     access_token: "access".to_string(),
///     refresh_token: "refresh".to_string(),
///     token_type: "Bearer".to_string(),
///     expiry: None,
/// };
/// assert_eq!(credential.authorization_header(), "Bearer access");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCredential {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expiry: Option<DateTime<Utc>>,
}

impl AccessCredential {
    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        let scheme = if self.token_type.is_empty() || self.token_type.eq_ignore_ascii_case("bearer")
        {
            "Bearer"
        } else {
            self.token_type.as_str()
        };
        format!("{scheme} {}", self.access_token)
    }
}

/// Body of a successful `/oauth/token` response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    /// Convert into a credential, falling back to `previous_refresh` when the
    /// server does not rotate the refresh token.
    pub(crate) fn into_credential(
        self,
        previous_refresh: Option<&str>,
        now: DateTime<Utc>,
    ) -> Option<AccessCredential> {
        if self.access_token.trim().is_empty() {
            return None;
        }
        let refresh_token = self
            .refresh_token
            .filter(|t| !t.is_empty())
            .or_else(|| previous_refresh.map(str::to_string))
            .unwrap_or_default();
        Some(AccessCredential {
            access_token: self.access_token,
            refresh_token,
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expiry: self
                .expires_in
                .filter(|secs| *secs > 0)
                .map(|secs| now + Duration::seconds(secs)),
        })
    }
}
