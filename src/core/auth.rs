//! Authentication and authorization
//!
//! An [`AuthProvider`] turns a bearer token into an [`Identity`]. The
//! request middleware then resolves the caller's profile (their `users`
//! document, which carries the role) into an [`AuthContext`], and each
//! route group checks its [`AuthPolicy`] against that context.

use crate::core::error::{AppResult, RequestError};
use async_trait::async_trait;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Role stored on a user profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verified identity, as reported by the authentication service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Authorization context attached to each request
#[derive(Debug, Clone, PartialEq)]
pub enum AuthContext {
    /// Authenticated user with a resolved profile
    User {
        uid: String,
        email: Option<String>,
        name: String,
        role: Role,
    },

    /// No valid credentials
    Anonymous,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        matches!(self, AuthContext::User { role: Role::Admin, .. })
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, AuthContext::Anonymous)
    }

    pub fn uid(&self) -> Option<&str> {
        match self {
            AuthContext::User { uid, .. } => Some(uid),
            AuthContext::Anonymous => None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            AuthContext::User { role, .. } => Some(*role),
            AuthContext::Anonymous => None,
        }
    }
}

/// Authorization policy for a route group
#[derive(Debug, Clone, PartialEq)]
pub enum AuthPolicy {
    /// Public access (no auth required)
    Public,

    /// Any authenticated user
    Authenticated,

    /// User must have one of these roles
    HasRole(Vec<Role>),

    /// Admin only
    AdminOnly,

    /// Combination of policies (AND)
    And(Vec<AuthPolicy>),

    /// Combination of policies (OR)
    Or(Vec<AuthPolicy>),
}

impl AuthPolicy {
    /// Check if auth context satisfies this policy
    pub fn check(&self, context: &AuthContext) -> bool {
        match self {
            AuthPolicy::Public => true,
            AuthPolicy::Authenticated => context.is_authenticated(),
            AuthPolicy::HasRole(roles) => context.role().is_some_and(|r| roles.contains(&r)),
            AuthPolicy::AdminOnly => context.is_admin(),
            AuthPolicy::And(policies) => policies.iter().all(|p| p.check(context)),
            AuthPolicy::Or(policies) => policies.iter().any(|p| p.check(context)),
        }
    }

    /// Check the policy, distinguishing missing credentials (401) from
    /// insufficient rights (403)
    pub fn authorize(&self, context: &AuthContext) -> Result<(), RequestError> {
        if self.check(context) {
            return Ok(());
        }
        match context {
            AuthContext::Anonymous => Err(RequestError::Unauthorized {
                message: "a valid bearer token is required".to_string(),
            }),
            AuthContext::User { role, .. } => Err(RequestError::Forbidden {
                message: format!("role '{role}' may not access this resource"),
            }),
        }
    }

    /// Parse policy from string (for YAML config)
    pub fn parse_policy(s: &str) -> Self {
        match s {
            "public" => AuthPolicy::Public,
            "authenticated" => AuthPolicy::Authenticated,
            "admin_only" => AuthPolicy::AdminOnly,
            "role:admin" => AuthPolicy::HasRole(vec![Role::Admin]),
            "role:user" => AuthPolicy::HasRole(vec![Role::User]),
            _ => AuthPolicy::Authenticated,
        }
    }
}

/// Trait for token verification backends
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Verify a bearer token; invalid tokens yield `RequestError::Unauthorized`
    async fn verify_token(&self, token: &str) -> AppResult<Identity>;

    /// Provider name for logs
    fn name(&self) -> &'static str;
}

/// Extract the bearer token from the `Authorization` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Fixed token table, for development and tests
#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    tokens: HashMap<String, Identity>,
}

impl StaticTokenProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.tokens.insert(token.into(), identity);
        self
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl AuthProvider for StaticTokenProvider {
    async fn verify_token(&self, token: &str) -> AppResult<Identity> {
        self.tokens.get(token).cloned().ok_or_else(|| {
            RequestError::Unauthorized {
                message: "unknown token".to_string(),
            }
            .into()
        })
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

#[cfg(feature = "firebase")]
pub use identity_toolkit::IdentityToolkitProvider;

#[cfg(feature = "firebase")]
mod identity_toolkit {
    use super::{AuthProvider, Identity};
    use crate::core::error::{AppResult, RequestError, StorageError};
    use async_trait::async_trait;
    use secrecy::{ExposeSecret, SecretString};
    use serde::Deserialize;

    const DEFAULT_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

    /// Verifies ID tokens with the hosted `accounts:lookup` endpoint
    pub struct IdentityToolkitProvider {
        http: reqwest::Client,
        api_key: SecretString,
        base_url: String,
    }

    #[derive(Deserialize)]
    struct LookupResponse {
        #[serde(default)]
        users: Vec<LookupUser>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct LookupUser {
        local_id: String,
        email: Option<String>,
        display_name: Option<String>,
    }

    impl IdentityToolkitProvider {
        pub fn new(api_key: SecretString) -> Self {
            Self {
                http: reqwest::Client::new(),
                api_key,
                base_url: DEFAULT_BASE_URL.to_string(),
            }
        }

        /// Point at another endpoint (an emulator, usually)
        pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
            self.base_url = base_url.into().trim_end_matches('/').to_string();
            self
        }
    }

    #[async_trait]
    impl AuthProvider for IdentityToolkitProvider {
        async fn verify_token(&self, token: &str) -> AppResult<Identity> {
            let url = format!("{}/accounts:lookup", self.base_url);
            let response = self
                .http
                .post(&url)
                .query(&[("key", self.api_key.expose_secret())])
                .json(&serde_json::json!({ "idToken": token }))
                .send()
                .await
                .map_err(|e| StorageError::Unavailable {
                    backend: "identitytoolkit".to_string(),
                    message: e.to_string(),
                })?;

            if response.status().is_client_error() {
                tracing::debug!(status = %response.status(), "id token rejected");
                return Err(RequestError::Unauthorized {
                    message: "invalid or expired ID token".to_string(),
                }
                .into());
            }
            if !response.status().is_success() {
                return Err(StorageError::QueryError {
                    backend: "identitytoolkit".to_string(),
                    message: format!("accounts:lookup returned {}", response.status()),
                }
                .into());
            }

            let body: LookupResponse =
                response.json().await.map_err(|e| StorageError::Serialization {
                    message: e.to_string(),
                })?;
            let user = body.users.into_iter().next().ok_or_else(|| {
                RequestError::Unauthorized {
                    message: "token does not belong to any account".to_string(),
                }
            })?;

            Ok(Identity {
                uid: user.local_id,
                email: user.email,
                display_name: user.display_name,
            })
        }

        fn name(&self) -> &'static str {
            "identity_toolkit"
        }
    }
}
