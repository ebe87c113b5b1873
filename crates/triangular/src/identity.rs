//! Identifier newtypes and the trusted caller identity supplied by the upstream auth layer.

use std::sync::atomic::{AtomicU64, Ordering};

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::users::UserType;

macro_rules! sequential_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn generate() -> Self {
                static SEQUENCE: AtomicU64 = AtomicU64::new(1);
                let id = SEQUENCE.fetch_add(1, Ordering::Relaxed);
                Self(format!(concat!($prefix, "-{:06}"), id))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

sequential_id!(
    /// Identifier wrapper for registered users.
    UserId,
    "usr"
);
sequential_id!(OpportunityId, "opp");
sequential_id!(
    /// Identifier wrapper for submitted applications.
    ApplicationId,
    "app"
);
sequential_id!(QuoteRequestId, "qrq");
sequential_id!(QuoteId, "quo");
sequential_id!(LedgerEntryId, "rep");

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Authenticated caller forwarded by the gateway. Credentials are never re-verified here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub role: Option<UserType>,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role.map(UserType::is_admin).unwrap_or(false)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": "missing x-user-id header" })),
                )
            })?;

        let role = match parts.headers.get(USER_ROLE_HEADER) {
            None => None,
            Some(raw) => {
                let parsed = raw.to_str().ok().and_then(UserType::parse);
                if parsed.is_none() {
                    return Err((
                        StatusCode::UNAUTHORIZED,
                        Json(json!({ "error": "unrecognized x-user-role header" })),
                    ));
                }
                parsed
            }
        };

        Ok(Self {
            user_id: UserId(user_id.to_string()),
            role,
        })
    }
}
