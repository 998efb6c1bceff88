//! User profiles
//!
//! A profile is the `users` document keyed by the authentication uid. It
//! carries the role that drives route access.

use crate::core::auth::{AuthContext, Identity, Role};
use crate::core::error::AppResult;
use crate::core::service::CollectionService;
use crate::impl_document;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// An application user profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub created_at: String,
}

impl_document!(
    User,
    "users",
    "user",
    ["name", "email"],
    validate: {
        create: {
            name: [required, string_length(1, 200)],
            email: [required, email],
            role: [optional, in_list("admin", "user")],
        },
        update: {
            name: [optional, string_length(1, 200)],
            email: [optional, email],
            role: [optional, in_list("admin", "user")],
        },
    },
    filters: {
        create: {
            name: [trim],
            email: [trim, lowercase],
        },
        update: {
            name: [trim],
            email: [trim, lowercase],
        },
    }
);

/// Timestamp format shared by every stored date (`2024-05-01T10:00:00.000Z`)
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl User {
    /// The profile created on first sign-in
    ///
    /// The name falls back from the display name to the e-mail local part,
    /// then to "User".
    pub fn provisioned(identity: &Identity, now: DateTime<Utc>) -> Self {
        let name = identity
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .or_else(|| {
                identity
                    .email
                    .as_deref()
                    .and_then(|e| e.split('@').next())
                    .filter(|local| !local.is_empty())
            })
            .unwrap_or("User")
            .to_string();

        Self {
            id: identity.uid.clone(),
            name,
            email: identity.email.clone().unwrap_or_default(),
            role: Role::User,
            created_at: iso_timestamp(now),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Authorization context for this profile
    pub fn auth_context(&self) -> AuthContext {
        AuthContext::User {
            uid: self.id.clone(),
            email: Some(self.email.clone()).filter(|e| !e.is_empty()),
            name: self.name.clone(),
            role: self.role,
        }
    }
}

/// Load the caller's profile, creating it with role `user` when missing
pub async fn resolve_profile(
    users: &dyn CollectionService<User>,
    identity: &Identity,
) -> AppResult<User> {
    if let Some(user) = users.fetch_one(&identity.uid).await? {
        return Ok(user);
    }
    let profile = User::provisioned(identity, Utc::now());
    tracing::info!(uid = %identity.uid, name = %profile.name, "provisioning user profile");
    users.set(&identity.uid, profile).await
}

/// Ensure a profile exists for `uid` with the admin role
///
/// An existing profile is promoted; a missing one is created.
pub async fn ensure_admin(
    users: &dyn CollectionService<User>,
    uid: &str,
    name: &str,
    email: &str,
) -> AppResult<User> {
    match users.fetch_one(uid).await? {
        Some(user) if user.is_admin() => Ok(user),
        Some(mut user) => {
            tracing::info!(%uid, "promoting bootstrap user to admin");
            user.role = Role::Admin;
            users.set(uid, user).await
        }
        None => {
            tracing::info!(%uid, "creating bootstrap admin profile");
            let admin = User {
                id: uid.to_string(),
                name: name.to_string(),
                email: email.to_string(),
                role: Role::Admin,
                created_at: iso_timestamp(Utc::now()),
            };
            users.set(uid, admin).await
        }
    }
}
