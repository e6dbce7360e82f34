//! Authentication middleware.
//!
//! The single place where a caller identity is established. Credentials are
//! issued elsewhere; this layer only maps an already-issued bearer token, or
//! a username asserted by a trusted upstream proxy header, to an
//! [`Identity`] and inserts it into the request extensions. Handlers extract
//! `Extension<Identity>` and never look at credentials themselves.

use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use fc_core::config::AuthConfig;
use fc_core::{Error, Identity};

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::request_id::RequestId;

/// Resolve the caller identity from raw header values.
///
/// Resolution order:
/// 1. auth disabled: the anonymous identity
/// 2. `Authorization: Bearer <token>` matched against configured tokens
/// 3. the configured trusted header, if any
pub fn resolve_identity(
    auth: &AuthConfig,
    authorization: Option<&str>,
    trusted_value: Option<&str>,
) -> Option<Identity> {
    if !auth.enabled {
        return Some(Identity::anonymous());
    }

    if let Some(token) = authorization.and_then(|v| v.strip_prefix("Bearer ")) {
        let token = token.trim();
        if let Some(entry) = auth
            .tokens
            .iter()
            .find(|t| !t.token.is_empty() && t.token == token)
        {
            return Some(Identity::new(entry.username.clone(), entry.is_admin));
        }
    }

    if auth.trusted_header.is_some() {
        if let Some(user) = trusted_value.map(str::trim).filter(|u| !u.is_empty()) {
            return Some(Identity::new(user, false));
        }
    }

    None
}

/// Authentication middleware. Applied to protected routes only.
pub async fn auth_middleware(
    State(ctx): State<AppContext>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let headers = request.headers();
    let authorization = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let trusted_value = ctx
        .config
        .auth
        .trusted_header
        .as_deref()
        .and_then(|name| headers.get(name))
        .and_then(|v| v.to_str().ok());

    match resolve_identity(&ctx.config.auth, authorization, trusted_value) {
        Some(identity) => {
            tracing::trace!(username = %identity.username, "Caller identified");
            request.extensions_mut().insert(identity);
            Ok(next.run(request).await)
        }
        None => {
            let mut err = AppError::new(Error::Unauthorized("authentication required".into()));
            if let Some(rid) = request.extensions().get::<RequestId>() {
                err = err.with_request_id(rid.0.clone());
            }
            Err(err.into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_core::config::ApiToken;

    fn config() -> AuthConfig {
        AuthConfig {
            enabled: true,
            tokens: vec![
                ApiToken {
                    token: "t-ana".into(),
                    username: "ana".into(),
                    is_admin: false,
                },
                ApiToken {
                    token: "t-root".into(),
                    username: "root".into(),
                    is_admin: true,
                },
            ],
            trusted_header: Some("x-forwarded-user".into()),
        }
    }

    #[test]
    fn disabled_auth_is_anonymous() {
        let auth = AuthConfig::default();
        assert_eq!(resolve_identity(&auth, None, None), Some(Identity::anonymous()));
    }

    #[test]
    fn bearer_token_maps_to_identity() {
        let id = resolve_identity(&config(), Some("Bearer t-root"), None).unwrap();
        assert_eq!(id, Identity::new("root", true));
    }

    #[test]
    fn unknown_token_falls_through_to_trusted_header() {
        let id = resolve_identity(&config(), Some("Bearer nope"), Some("bo")).unwrap();
        assert_eq!(id, Identity::new("bo", false));
    }

    #[test]
    fn no_credentials_is_rejected() {
        assert!(resolve_identity(&config(), None, None).is_none());
        assert!(resolve_identity(&config(), Some("Basic abc"), Some("  ")).is_none());
    }

    #[test]
    fn trusted_header_ignored_when_not_configured() {
        let mut auth = config();
        auth.trusted_header = None;
        assert!(resolve_identity(&auth, None, Some("mallory")).is_none());
    }
}
