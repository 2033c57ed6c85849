use crate::config::Config;
use crate::crypto::PasswordHasher;
use crate::errors::AuthError;
use crate::models::{
    Credentials, PrincipalResponse, RefreshRequest, RegistrationRequest, RequestContext,
    StudentLogin, StudentRegistration, TeacherLogin, TeacherRegistration, TokenPair,
};
use crate::services::token_service::TokenIssuer;
use crate::services::{login_service, registration_service, token_service};
use super::request_body::AuthJson;
use axum::{
    extract::{ConnectInfo, State},
    http::{header::USER_AGENT, HeaderMap, StatusCode},
    Json,
};
use sqlx::SqlitePool;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::instrument;

const MAX_USER_AGENT_LENGTH: usize = 512;

/// Application state shared across handlers
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub issuer: TokenIssuer,
    pub hasher: PasswordHasher,
}

impl AppState {
    /// Build the issuer and hasher from configuration.
    pub fn new(pool: SqlitePool, config: Config) -> Result<Self, AuthError> {
        let issuer = TokenIssuer::from_config(&config)?;
        let hasher = PasswordHasher::new(config.bcrypt_cost)?;
        Ok(Self {
            pool,
            config,
            issuer,
            hasher,
        })
    }
}

/// Peer address and User-Agent for the audit log.
///
/// The peer address is only known when the server was started with
/// connect info.
fn request_context(addr: Option<ConnectInfo<SocketAddr>>, headers: &HeaderMap) -> RequestContext {
    RequestContext {
        ip_address: addr.map(|ConnectInfo(addr)| addr.ip().to_string()),
        user_agent: headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|ua| ua.chars().take(MAX_USER_AGENT_LENGTH).collect()),
    }
}

async fn register(
    state: &AppState,
    request: RegistrationRequest,
    context: RequestContext,
) -> Result<(StatusCode, Json<PrincipalResponse>), AuthError> {
    let principal = registration_service::register(
        &state.pool,
        &state.hasher,
        &state.config.teacher_email_suffix(),
        request,
        &context,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(PrincipalResponse::from(&principal))))
}

/// Handle student registration
///
/// POST /register/student/
#[instrument(name = "auth.register.student", skip_all)]
pub async fn handle_register_student(
    State(state): State<Arc<AppState>>,
    addr: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    AuthJson(payload): AuthJson<StudentRegistration>,
) -> Result<(StatusCode, Json<PrincipalResponse>), AuthError> {
    let context = request_context(addr, &headers);
    register(&state, RegistrationRequest::Student(payload), context).await
}

/// Handle teacher registration
///
/// POST /register/teacher/
#[instrument(name = "auth.register.teacher", skip_all)]
pub async fn handle_register_teacher(
    State(state): State<Arc<AppState>>,
    addr: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    AuthJson(payload): AuthJson<TeacherRegistration>,
) -> Result<(StatusCode, Json<PrincipalResponse>), AuthError> {
    let context = request_context(addr, &headers);
    register(&state, RegistrationRequest::Teacher(payload), context).await
}

async fn login(
    state: &AppState,
    credentials: Credentials,
    context: RequestContext,
) -> Result<Json<TokenPair>, AuthError> {
    let pair = login_service::login(
        &state.pool,
        &state.hasher,
        &state.issuer,
        credentials,
        &context,
    )
    .await?;

    Ok(Json(pair))
}

/// Handle student login
///
/// POST /login/student/
#[instrument(name = "auth.login.student", skip_all)]
pub async fn handle_login_student(
    State(state): State<Arc<AppState>>,
    addr: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    AuthJson(payload): AuthJson<StudentLogin>,
) -> Result<Json<TokenPair>, AuthError> {
    let context = request_context(addr, &headers);
    login(&state, Credentials::from(payload), context).await
}

/// Handle teacher login
///
/// POST /login/teacher/
#[instrument(name = "auth.login.teacher", skip_all)]
pub async fn handle_login_teacher(
    State(state): State<Arc<AppState>>,
    addr: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    AuthJson(payload): AuthJson<TeacherLogin>,
) -> Result<Json<TokenPair>, AuthError> {
    let context = request_context(addr, &headers);
    login(&state, Credentials::from(payload), context).await
}

/// Handle refresh token rotation
///
/// POST /token/refresh/
#[instrument(name = "auth.token.refresh", skip_all)]
pub async fn handle_token_refresh(
    State(state): State<Arc<AppState>>,
    addr: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    AuthJson(payload): AuthJson<RefreshRequest>,
) -> Result<Json<TokenPair>, AuthError> {
    let context = request_context(addr, &headers);
    let pair = token_service::refresh_pair(&state.pool, &state.issuer, payload, &context).await?;
    Ok(Json(pair))
}
