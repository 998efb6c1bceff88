//! Request authentication and route-group authorization
//!
//! [`authenticate`] runs once per request on every protected route: it
//! reads the bearer token, verifies it with the configured
//! [`AuthProvider`](crate::core::auth::AuthProvider), resolves the caller's
//! profile and stores the resulting [`AuthContext`] in the request
//! extensions. [`guarded`] then checks a route group's [`AuthPolicy`]
//! against that context.

use crate::core::auth::{AuthContext, AuthPolicy, bearer_token};
use crate::core::error::AppError;
use crate::entities::user::resolve_profile;
use crate::server::host::AppState;
use axum::Router;
use axum::extract::{FromRequestParts, Query, Request, State};
use axum::http::request::Parts;
use axum::middleware::{self, Next};
use axum::response::Response;
use std::collections::HashMap;
use std::convert::Infallible;

/// Query parameter accepted in place of the `Authorization` header
///
/// Browsers cannot set headers on an `EventSource`, so `/events` clients
/// pass the token this way.
pub const TOKEN_QUERY_PARAM: &str = "access_token";

fn request_token(request: &Request) -> Option<String> {
    if let Some(token) = bearer_token(request.headers()) {
        return Some(token.to_string());
    }
    let Query(params) = Query::<HashMap<String, String>>::try_from_uri(request.uri()).ok()?;
    params
        .get(TOKEN_QUERY_PARAM)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Resolve the caller into an [`AuthContext`]
///
/// Requests without a token continue as [`AuthContext::Anonymous`]; a
/// token that fails verification is rejected with 401.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let context = match request_token(&request) {
        None => AuthContext::Anonymous,
        Some(token) => {
            let identity = state.auth.verify_token(&token).await.inspect_err(|e| {
                tracing::debug!(provider = state.auth.name(), error = %e, "token rejected");
            })?;
            let profile = resolve_profile(state.collections.users.as_ref(), &identity).await?;
            profile.auth_context()
        }
    };

    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

/// Reject requests whose context does not satisfy `policy`
pub async fn require_policy(
    State(policy): State<AuthPolicy>,
    context: AuthContext,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    policy.authorize(&context).inspect_err(|_| {
        tracing::debug!(
            uid = context.uid().unwrap_or("-"),
            path = %request.uri().path(),
            ?policy,
            "access denied"
        );
    })?;
    Ok(next.run(request).await)
}

/// Apply `policy` to every route of `router`
///
/// Public routers are returned unchanged. The router must already
/// contain its routes.
pub fn guarded(router: Router, policy: AuthPolicy) -> Router {
    if policy == AuthPolicy::Public {
        return router;
    }
    router.route_layer(middleware::from_fn_with_state(policy, require_policy))
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .unwrap_or(AuthContext::Anonymous))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_request_token_prefers_header() {
        let request = Request::builder()
            .uri("/events?access_token=from-query")
            .header("authorization", "Bearer from-header")
            .body(Body::empty())
            .unwrap();
        assert_eq!(request_token(&request).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_request_token_from_query() {
        let request = Request::builder()
            .uri("/events?access_token=abc&x=1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(request_token(&request).as_deref(), Some("abc"));

        let request = Request::builder()
            .uri("/events?access_token=")
            .body(Body::empty())
            .unwrap();
        assert_eq!(request_token(&request), None);
    }

    #[tokio::test]
    async fn test_context_extractor_defaults_to_anonymous() {
        let (mut parts, _) = Request::builder().body(Body::empty()).unwrap().into_parts();
        let context = AuthContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(context, AuthContext::Anonymous);
    }
}
