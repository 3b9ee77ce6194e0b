use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::D1Error;
use crate::types::{datetime, Subject};

/// Claims carried by a DataONE bearer token.
///
/// The token is a JWT signed by the coordinating nodes. The client only
/// reads its payload to learn the subject and expiry; the signature is
/// verified by the nodes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
    #[serde(rename = "fullName", default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(rename = "issuedAt", default)]
    pub issued_at: Option<String>,
    /// Lifetime in seconds, counted from `issuedAt`.
    #[serde(default)]
    pub ttl: Option<i64>,
}

impl TokenClaims {
    /// Decodes the payload segment of a JWT.
    pub fn decode(token: &str) -> Result<Self, D1Error> {
        let mut segments = token.trim().split('.');
        let payload = match (segments.next(), segments.next(), segments.next()) {
            (Some(_), Some(payload), Some(_)) => payload,
            _ => {
                return Err(D1Error::client_message(
                    "Token is not a JWT (expected three dot separated segments)",
                ))
            }
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| D1Error::client_side("Token payload is not base64url", Some(e)))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| D1Error::client_side("Token payload is not a JSON object", Some(e)))
    }

    /// The subject the token authenticates: `sub`, else `userId`.
    pub fn subject(&self) -> Option<Subject> {
        non_empty(&self.sub)
            .or_else(|| non_empty(&self.user_id))
            .map(Subject::from)
    }

    /// When the token stops being valid, if it says so. A lifetime that
    /// overflows the calendar gives `None`.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        if let Some(exp) = self.exp {
            return DateTime::from_timestamp(exp, 0);
        }

        let issued = datetime::parse(self.issued_at.as_deref()?).ok()?;
        issued.checked_add_signed(Duration::try_seconds(self.ttl?)?)
    }

    /// Tokens without expiry information never count as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().map(|at| now >= at).unwrap_or(false)
    }
}

fn non_empty(claim: &Option<String>) -> Option<&str> {
    claim.as_deref().filter(|s| !s.is_empty())
}
