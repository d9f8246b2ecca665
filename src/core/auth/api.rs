//! Auth API endpoints
//!
//! Provides REST API endpoints for the session strategy:
//! - POST /api/auth/signin - Sign in with credentials and set the session cookie
//! - GET /api/auth/session - Current session, refreshing the token
//! - POST /api/auth/signout - Clear the session cookie
//! - GET /api/auth/health - Database health check

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use time::Duration as TimeDuration;

use crate::core::auth::callbacks::UserLookup;
use crate::core::auth::jwt::SignedToken;
use crate::core::auth::service::{AuthError, AuthService, CredentialsAuthorizer, SignInRequest};
use crate::core::auth::session::Session;
use crate::core::db::{PgPool, health_check};

/// Session cookie name
pub const SESSION_COOKIE: &str = "authjs.session-token";

/// Auth API state containing the auth service
pub struct AuthApiState<S> {
    pub auth_service: AuthService<S>,
    /// Probed by the health endpoint when present
    pub pool: Option<PgPool>,
    pub secure_cookies: bool,
}

impl<S> Clone for AuthApiState<S> {
    fn clone(&self) -> Self {
        Self {
            auth_service: self.auth_service.clone(),
            pool: self.pool.clone(),
            secure_cookies: self.secure_cookies,
        }
    }
}

impl<S> AuthApiState<S>
where
    S: UserLookup + CredentialsAuthorizer,
{
    pub fn new(auth_service: AuthService<S>) -> Self {
        Self {
            auth_service,
            pool: None,
            secure_cookies: false,
        }
    }

    pub fn with_pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    fn session_cookie(&self, signed: &SignedToken) -> Cookie<'static> {
        let max_age = (signed.expires_at - Utc::now()).num_seconds().max(0);

        Cookie::build((SESSION_COOKIE, signed.token.clone()))
            .path("/")
            .http_only(true)
            .secure(self.secure_cookies)
            .same_site(SameSite::Lax)
            .max_age(TimeDuration::seconds(max_age))
            .build()
    }
}

fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .max_age(TimeDuration::ZERO)
        .build()
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

/// Convert AuthError to API response
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            AuthError::InvalidEmail => (StatusCode::BAD_REQUEST, "INVALID_EMAIL"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED"),
            AuthError::Store(_) => (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE"),
            AuthError::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        // Store and internal details stay in the logs
        let message = match &self {
            AuthError::Store(_) | AuthError::InternalError(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(ApiError::new(message, code))).into_response()
    }
}

/// Response for a successful sign-in
#[derive(Debug, Serialize)]
pub struct SignInApiResponse {
    pub session: Session,
    pub token: String,
}

/// Generic success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

/// Response for the health check
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
}

/// Create the auth API router
pub fn auth_api_router<S>(state: AuthApiState<S>) -> Router
where
    S: UserLookup + CredentialsAuthorizer + 'static,
{
    let state = Arc::new(state);

    Router::new()
        .route("/api/auth/signin", post(sign_in_handler::<S>))
        .route("/api/auth/session", get(session_handler::<S>))
        .route("/api/auth/signout", post(sign_out_handler::<S>))
        .route("/api/auth/health", get(health_handler::<S>))
        .with_state(state)
}

/// POST /api/auth/signin
/// Sign in and set the session cookie
async fn sign_in_handler<S>(
    State(state): State<Arc<AuthApiState<S>>>,
    jar: CookieJar,
    Json(request): Json<SignInRequest>,
) -> Result<(CookieJar, Json<SignInApiResponse>), AuthError>
where
    S: UserLookup + CredentialsAuthorizer + 'static,
{
    let response = state.auth_service.sign_in(request).await?;

    if let Some(sub) = response.token.claims.sub.as_deref() {
        tracing::info!("User signed in: {}", sub);
    }

    let jar = jar.add(state.session_cookie(&response.token));

    Ok((
        jar,
        Json(SignInApiResponse {
            session: response.session,
            token: response.token.token,
        }),
    ))
}

/// GET /api/auth/session
/// Current session; `null` when there is no valid token
async fn session_handler<S>(
    State(state): State<Arc<AuthApiState<S>>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<(CookieJar, Json<Option<Session>>), AuthError>
where
    S: UserLookup + CredentialsAuthorizer + 'static,
{
    let Some(raw) = session_token(&jar, &headers) else {
        return Ok((jar, Json(None)));
    };

    match state.auth_service.session(&raw).await {
        Ok(response) => {
            let jar = jar.add(state.session_cookie(&response.token));
            Ok((jar, Json(Some(response.session))))
        }
        Err(AuthError::InvalidToken | AuthError::TokenExpired) => {
            tracing::debug!("Discarding invalid session token");
            Ok((jar.add(removal_cookie()), Json(None)))
        }
        Err(e) => Err(e),
    }
}

/// POST /api/auth/signout
/// Clear the session cookie
async fn sign_out_handler<S>(
    State(state): State<Arc<AuthApiState<S>>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> (CookieJar, Json<SuccessResponse>)
where
    S: UserLookup + CredentialsAuthorizer + 'static,
{
    let raw = session_token(&jar, &headers);
    state.auth_service.sign_out(raw.as_deref());

    (
        jar.add(removal_cookie()),
        Json(SuccessResponse {
            success: true,
            message: "Signed out successfully".to_string(),
        }),
    )
}

/// GET /api/auth/health
async fn health_handler<S>(
    State(state): State<Arc<AuthApiState<S>>>,
) -> Result<Json<HealthResponse>, AuthError>
where
    S: UserLookup + CredentialsAuthorizer + 'static,
{
    let database = match &state.pool {
        Some(pool) => {
            health_check(pool).await.map_err(AuthError::store)?;
            true
        }
        None => false,
    };

    Ok(Json(HealthResponse {
        status: "ok",
        database,
    }))
}

/// Session token from the cookie, falling back to the Authorization header
fn session_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| extract_bearer_token(headers).ok())
}

/// Extract Bearer token from Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::InvalidToken)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidToken)?;

    if token.is_empty() {
        return Err(AuthError::InvalidToken);
    }

    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::jwt::{JwtConfig, JwtService, Token};
    use crate::core::auth::test_support::{MemoryUserStore, sample_user};
    use axum::{
        body::Body,
        http::{HeaderValue, Request},
    };
    use tower::ServiceExt;

    const SECRET: &str = "test_secret_key_for_testing_only_32bytes!";

    fn create_test_app() -> (Arc<MemoryUserStore>, Router) {
        let store = Arc::new(MemoryUserStore::new());
        store.insert_with_password(sample_user(), "Password123");

        let jwt = JwtService::new(JwtConfig::new(SECRET));
        let service = AuthService::new(Arc::clone(&store), jwt, false);
        (store, auth_api_router(AuthApiState::new(service)))
    }

    fn sign_in_request(password: &str) -> Request<Body> {
        let body = serde_json::json!({ "email": "a@b.com", "password": password });

        Request::builder()
            .method("POST")
            .uri("/api/auth/signin")
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn session_request(header_name: &str, header_value: String) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri("/api/auth/session")
            .header(header_name, header_value)
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn set_cookie(response: &Response) -> String {
        response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    async fn signed_in_token(app: &Router) -> String {
        let response = app.clone().oneshot(sign_in_request("Password123")).await.unwrap();
        let body = json_body(response).await;
        body["token"].as_str().unwrap().to_string()
    }

    // ========================================================================
    // Sign-in
    // ========================================================================

    #[tokio::test]
    async fn test_sign_in_sets_session_cookie() {
        let (_, app) = create_test_app();

        let response = app.oneshot(sign_in_request("Password123")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = set_cookie(&response);
        assert!(cookie.starts_with("authjs.session-token="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=259199") || cookie.contains("Max-Age=2592000"));

        let body = json_body(response).await;
        assert_eq!(body["session"]["user"]["id"], "u1");
        assert_eq!(body["session"]["user"]["realId"], "r1");
        assert_eq!(body["session"]["user"]["role"], "MENTOR");
        assert_eq!(body["session"]["user"]["subRole"], "LEAD");
        assert!(!body["token"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sign_in_wrong_password() {
        let (_, app) = create_test_app();

        let response = app.oneshot(sign_in_request("nope")).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(set_cookie(&response).is_empty());
        let body = json_body(response).await;
        assert_eq!(body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn test_sign_in_with_unusable_lifetime_fails_cleanly() {
        let store = Arc::new(MemoryUserStore::new());
        store.insert_with_password(sample_user(), "Password123");
        let jwt = JwtService::new(JwtConfig::new(SECRET).max_age(i64::MAX));
        let app = auth_api_router(AuthApiState::new(AuthService::new(store, jwt, false)));

        let response = app.oneshot(sign_in_request("Password123")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(set_cookie(&response).is_empty());
        let body = json_body(response).await;
        assert_eq!(body["code"], "INTERNAL_ERROR");
    }

    // ========================================================================
    // Session
    // ========================================================================

    #[tokio::test]
    async fn test_session_without_token_is_null() {
        let (_, app) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/auth/session")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(json_body(response).await.is_null());
    }

    #[tokio::test]
    async fn test_session_from_cookie_refreshes_cookie() {
        let (_, app) = create_test_app();
        let token = signed_in_token(&app).await;

        let response = app
            .oneshot(session_request(
                "Cookie",
                format!("{}={}", SESSION_COOKIE, token),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookie(&response).starts_with("authjs.session-token="));
        let body = json_body(response).await;
        assert_eq!(body["user"]["email"], "a@b.com");
        assert_eq!(body["user"]["name"], "Ann");
    }

    #[tokio::test]
    async fn test_session_from_bearer_header() {
        let (_, app) = create_test_app();
        let token = signed_in_token(&app).await;

        let response = app
            .oneshot(session_request("Authorization", format!("Bearer {}", token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["user"]["id"], "u1");
    }

    #[tokio::test]
    async fn test_session_with_invalid_cookie_clears_it() {
        let (_, app) = create_test_app();

        let response = app
            .oneshot(session_request(
                "Cookie",
                format!("{}=garbage", SESSION_COOKIE),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookie(&response).contains("Max-Age=0"));
        assert!(json_body(response).await.is_null());
    }

    #[tokio::test]
    async fn test_session_with_foreign_signature_is_null() {
        let (_, app) = create_test_app();
        let foreign = JwtService::new(JwtConfig::new("another_secret"))
            .issue(Token::for_subject("u1"))
            .unwrap();

        let response = app
            .oneshot(session_request(
                "Authorization",
                format!("Bearer {}", foreign.token),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(json_body(response).await.is_null());
    }

    #[tokio::test]
    async fn test_session_store_failure() {
        let (store, app) = create_test_app();
        let token = signed_in_token(&app).await;
        store.set_unavailable(true);

        let response = app
            .oneshot(session_request("Authorization", format!("Bearer {}", token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(body["code"], "STORE_UNAVAILABLE");
        assert_eq!(body["error"], "Internal server error");
    }

    // ========================================================================
    // Sign-out and health
    // ========================================================================

    #[tokio::test]
    async fn test_sign_out_clears_cookie() {
        let (_, app) = create_test_app();
        let token = signed_in_token(&app).await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/signout")
                    .header("Cookie", format!("{}={}", SESSION_COOKIE, token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = set_cookie(&response);
        assert!(cookie.starts_with("authjs.session-token="));
        assert!(cookie.contains("Max-Age=0"));
        assert_eq!(json_body(response).await["success"], true);
    }

    #[tokio::test]
    async fn test_health_without_database() {
        let (_, app) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/auth/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"], false);
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    #[test]
    fn test_extract_bearer_token_valid() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer my_token_123"),
        );

        let token = extract_bearer_token(&headers).unwrap();
        assert_eq!(token, "my_token_123");
    }

    #[test]
    fn test_extract_bearer_token_missing_header() {
        let headers = HeaderMap::new();

        let result = extract_bearer_token(&headers);
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_extract_bearer_token_invalid_format() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic base64credentials"),
        );

        let result = extract_bearer_token(&headers);
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_extract_bearer_token_empty_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));

        let result = extract_bearer_token(&headers);
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_auth_error_status_codes() {
        let cases = [
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::InvalidEmail, StatusCode::BAD_REQUEST),
            (AuthError::TokenExpired, StatusCode::UNAUTHORIZED),
            (
                AuthError::InternalError("boom".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_api_error_serialization() {
        let error = ApiError::new("Something went wrong", "ERROR_CODE");
        let json = serde_json::to_string(&error).unwrap();

        assert!(json.contains("Something went wrong"));
        assert!(json.contains("ERROR_CODE"));
    }
}
