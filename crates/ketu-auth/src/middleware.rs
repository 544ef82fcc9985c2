//! Request authentication gate for Axum
//!
//! Tower layer that guards a route subtree: it demands a well-formed
//! `Bearer` header carrying a valid access token, injects the verified
//! [`AuthenticatedPrincipal`] into request extensions and rejects
//! everything else with a JSON error body. Unlike a permissive
//! middleware, a gated route is never reached unauthenticated.

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderMap, StatusCode},
    response::Response,
};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::debug;

use crate::error::{AuthError, ErrorResponse};
use crate::token::TokenEngine;
use crate::types::{AuthenticatedPrincipal, PrincipalKind, TokenFlavor};

/// Authentication gate layer.
///
/// A gate built with [`AuthGateLayer::for_kind`] additionally requires
/// the token's principal kind to match, so owner routes cannot be
/// entered with a user token of a colliding id.
#[derive(Clone)]
pub struct AuthGateLayer {
    engine: Arc<TokenEngine>,
    kind: Option<PrincipalKind>,
}

impl AuthGateLayer {
    /// Gate accepting any principal kind
    pub fn any(engine: Arc<TokenEngine>) -> Self {
        Self { engine, kind: None }
    }

    /// Gate accepting only the given principal kind
    pub fn for_kind(engine: Arc<TokenEngine>, kind: PrincipalKind) -> Self {
        Self {
            engine,
            kind: Some(kind),
        }
    }
}

impl<S> Layer<S> for AuthGateLayer {
    type Service = AuthGate<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthGate {
            inner,
            engine: self.engine.clone(),
            kind: self.kind,
        }
    }
}

/// Authentication gate service
#[derive(Clone)]
pub struct AuthGate<S> {
    inner: S,
    engine: Arc<TokenEngine>,
    kind: Option<PrincipalKind>,
}

impl<S> Service<Request> for AuthGate<S>
where
    S: Service<Request, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let engine = self.engine.clone();
        let kind = self.kind;
        let mut inner = self.inner.clone();

        Box::pin(async move {
            match authenticate(req.headers(), &engine, kind) {
                Ok(principal) => {
                    debug!(id = principal.id, kind = %principal.kind, "request authenticated");
                    let (mut parts, body) = req.into_parts();
                    parts.extensions.insert(principal);
                    inner.call(Request::from_parts(parts, body)).await
                }
                Err(e) => Ok(auth_error_response(&e)),
            }
        })
    }
}

/// Authenticate a request from its headers alone.
///
/// Header parsing and token verification failures are reported as
/// distinct errors so clients can tell a missing header from a stale
/// token, but every failure is still a 401.
pub fn authenticate(
    headers: &HeaderMap,
    engine: &TokenEngine,
    kind: Option<PrincipalKind>,
) -> Result<AuthenticatedPrincipal, AuthError> {
    let header = headers
        .get("Authorization")
        .ok_or(AuthError::MissingAuthHeader)?;
    let header = header.to_str().map_err(|_| AuthError::MalformedAuthHeader)?;
    if header.is_empty() {
        return Err(AuthError::MissingAuthHeader);
    }

    let token = match header.split_once(' ') {
        Some(("Bearer", token)) if !token.is_empty() && !token.contains(' ') => token,
        _ => return Err(AuthError::MalformedAuthHeader),
    };

    let claims = engine.verify(token, TokenFlavor::Access)?;

    // A kind-scoped gate treats a wrong-kind token exactly like an
    // invalid one, leaking nothing about the other namespace.
    if let Some(required) = kind {
        if claims.kind != required {
            return Err(AuthError::InvalidToken);
        }
    }

    Ok(AuthenticatedPrincipal::from(claims))
}

fn auth_error_response(error: &AuthError) -> Response {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = ErrorResponse::from(error);

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap_or_default()))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

// =============================================================================
// Axum extractors
// =============================================================================

/// Extractor for the gate-verified principal. Rejects with 401 when used
/// on a route the gate does not cover.
pub struct Principal(pub AuthenticatedPrincipal);

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedPrincipal>()
            .cloned()
            .map(Principal)
            .ok_or_else(|| auth_error_response(&AuthError::MissingAuthHeader))
    }
}

/// Extractor for routes that work with or without authentication
pub struct OptionalPrincipal(pub Option<AuthenticatedPrincipal>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalPrincipal
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalPrincipal(
            parts.extensions.get::<AuthenticatedPrincipal>().cloned(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{body::to_bytes, routing::get, Router};
    use http::Request as HttpRequest;
    use tower::ServiceExt;

    use super::*;
    use crate::config::JwtConfig;
    use crate::types::Claims;

    fn test_engine() -> Arc<TokenEngine> {
        Arc::new(TokenEngine::new(&JwtConfig {
            access_secret: "access-secret-for-tests".to_string(),
            refresh_secret: "refresh-secret-for-tests".to_string(),
            access_ttl: Duration::from_secs(900),
            refresh_ttl: Duration::from_secs(3600),
        }))
    }

    fn test_claims(kind: PrincipalKind) -> Claims {
        Claims {
            id: 42,
            email: "a@x.com".to_string(),
            role: kind.default_role().to_string(),
            kind,
        }
    }

    async fn whoami(Principal(principal): Principal) -> String {
        format!("{}:{}", principal.kind, principal.id)
    }

    fn gated_app(layer: AuthGateLayer) -> Router {
        Router::new().route("/me", get(whoami)).layer(layer)
    }

    async fn send(app: Router, auth_header: Option<&str>) -> (StatusCode, String) {
        let mut request = HttpRequest::builder().uri("/me");
        if let Some(value) = auth_header {
            request = request.header("Authorization", value);
        }
        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn error_code(body: &str) -> String {
        let parsed: ErrorResponse = serde_json::from_str(body).unwrap();
        parsed.code
    }

    #[tokio::test]
    async fn test_missing_header_is_rejected() {
        let app = gated_app(AuthGateLayer::any(test_engine()));

        let (status, body) = send(app, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(&body), "AUTH_HEADER_MISSING");
    }

    #[tokio::test]
    async fn test_empty_header_is_rejected() {
        let app = gated_app(AuthGateLayer::any(test_engine()));

        let (status, body) = send(app, Some("")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(&body), "AUTH_HEADER_MISSING");
    }

    #[tokio::test]
    async fn test_non_bearer_scheme_is_rejected() {
        let app = gated_app(AuthGateLayer::any(test_engine()));

        let (status, body) = send(app, Some("Token abc")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(&body), "INVALID_AUTH_FORMAT");
    }

    #[tokio::test]
    async fn test_extra_header_parts_are_rejected() {
        let app = gated_app(AuthGateLayer::any(test_engine()));

        let (status, body) = send(app, Some("Bearer abc def")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(&body), "INVALID_AUTH_FORMAT");
    }

    #[tokio::test]
    async fn test_garbage_token_is_rejected() {
        let app = gated_app(AuthGateLayer::any(test_engine()));

        let (status, body) = send(app, Some("Bearer not.a.jwt")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(&body), "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

        #[derive(serde::Serialize)]
        struct StaleClaims {
            id: u64,
            email: String,
            role: String,
            kind: PrincipalKind,
            iat: i64,
            exp: i64,
        }

        let now = chrono::Utc::now().timestamp();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &StaleClaims {
                id: 42,
                email: "a@x.com".to_string(),
                role: "user".to_string(),
                kind: PrincipalKind::User,
                iat: now - 7200,
                exp: now - 3600,
            },
            &EncodingKey::from_secret(b"access-secret-for-tests"),
        )
        .unwrap();
        let app = gated_app(AuthGateLayer::any(test_engine()));

        let header = format!("Bearer {}", token);
        let (status, body) = send(app, Some(&header)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(&body), "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_refresh_token_is_rejected_at_the_gate() {
        let engine = test_engine();
        let refresh = engine
            .issue(&test_claims(PrincipalKind::User), TokenFlavor::Refresh)
            .unwrap();
        let app = gated_app(AuthGateLayer::any(engine));

        let header = format!("Bearer {}", refresh.token);
        let (status, body) = send(app, Some(&header)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(&body), "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_valid_token_reaches_the_handler() {
        let engine = test_engine();
        let access = engine
            .issue(&test_claims(PrincipalKind::User), TokenFlavor::Access)
            .unwrap();
        let app = gated_app(AuthGateLayer::any(engine));

        let header = format!("Bearer {}", access.token);
        let (status, body) = send(app, Some(&header)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "user:42");
    }

    #[tokio::test]
    async fn test_kind_scoped_gate_rejects_other_kind() {
        let engine = test_engine();
        let user_token = engine
            .issue(&test_claims(PrincipalKind::User), TokenFlavor::Access)
            .unwrap();
        let app = gated_app(AuthGateLayer::for_kind(engine, PrincipalKind::Owner));

        let header = format!("Bearer {}", user_token.token);
        let (status, body) = send(app, Some(&header)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(&body), "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_kind_scoped_gate_admits_matching_kind() {
        let engine = test_engine();
        let owner_token = engine
            .issue(&test_claims(PrincipalKind::Owner), TokenFlavor::Access)
            .unwrap();
        let app = gated_app(AuthGateLayer::for_kind(engine, PrincipalKind::Owner));

        let header = format!("Bearer {}", owner_token.token);
        let (status, body) = send(app, Some(&header)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "owner:42");
    }
}
