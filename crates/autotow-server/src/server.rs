// crates/autotow-server/src/server.rs
// ============================================================================
// Module: AutoTow HTTP Server
// Description: Axum router, handlers, and session cookies for AutoTow.
// Purpose: Expose ingestion, dashboard, query console, and reports over HTTP.
// Dependencies: autotow-core, autotow-config, autotow-store-sqlite, axum, tokio
// ============================================================================

//! ## Overview
//! [`AutotowServer`] validates configuration, opens the `SQLite` store,
//! ensures the bootstrap admin exists, and serves the route table below.
//! Handlers are thin: they resolve the session cookie, move blocking store
//! work off the async executor, call one core service, and map the outcome
//! to a status code and body.
//!
//! | Route | Access |
//! |---|---|
//! | `POST /api/upload` | public |
//! | `POST /api/register` | admin session |
//! | `GET/POST /login`, `GET/POST /logout` | public |
//! | `GET /dashboard`, `POST /dashboard/query`, `GET /api/records` | session |
//! | `GET /view/{uuid}` | public |
//! | `POST /admin/reset` | admin session |
//! | `GET /healthz` | public |

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;

use autotow_config::AutotowConfig;
use autotow_core::Authenticator;
use autotow_core::CredentialStore;
use autotow_core::ExperimentRecord;
use autotow_core::IngestStatus;
use autotow_core::IngestionService;
use autotow_core::NewAccountRequest;
use autotow_core::Principal;
use autotow_core::QueryExecutor;
use autotow_core::QueryOutcome;
use autotow_core::RecordStore;
use autotow_core::ReportRenderer;
use autotow_core::Role;
use autotow_core::ServiceError;
use autotow_core::SessionRegistry;
use autotow_core::SqlConsole;
use autotow_core::StatementKind;
use autotow_core::StoreAdmin;
use autotow_core::build_account;
use autotow_store_sqlite::SqliteStore;
use axum::Form;
use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::Path;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::COOKIE;
use axum::http::header::SET_COOKIE;
use axum::response::Html;
use axum::response::IntoResponse;
use axum::response::Redirect;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Deserialize;
use serde_json::json;

use crate::audit::AuditEvent;
use crate::audit::AuditEventParams;
use crate::audit::AuditSink;
use crate::audit::FileAuditSink;
use crate::audit::NoopAuditSink;
use crate::audit::StderrAuditSink;
use crate::pages;
use crate::pages::DashboardView;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "autotow_session";
/// Random bytes in a generated per-process secret key.
const GENERATED_SECRET_BYTES: usize = 32;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server startup and transport errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration rejected.
    #[error("config error: {0}")]
    Config(String),
    /// Store or audit initialization failed.
    #[error("init error: {0}")]
    Init(String),
    /// Listener or connection failure.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// AutoTow HTTP server instance.
pub struct AutotowServer {
    /// Validated configuration.
    config: AutotowConfig,
    /// Shared handler state.
    state: Arc<ServerState>,
}

impl AutotowServer {
    /// Builds a server from configuration, using the configured audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when validation, store setup, or bootstrap
    /// fails.
    pub fn from_config(config: AutotowConfig) -> Result<Self, ServerError> {
        let audit = audit_sink_from_config(&config)?;
        Self::with_audit_sink(config, audit)
    }

    /// Builds a server that records audit events to `audit`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when validation, store setup, or bootstrap
    /// fails.
    pub fn with_audit_sink(
        config: AutotowConfig,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let state = build_server_state(&config, audit)?;
        let created = state
            .auth
            .bootstrap(state.bootstrap.clone())
            .map_err(|err| ServerError::Init(err.to_string()))?;
        if config.uses_default_bootstrap_password() {
            emit_default_password_warning(&config.auth.bootstrap_username);
        }
        state.audit.record(&AuditEvent::new(
            "startup",
            AuditEventParams::outcome(if created { "bootstrap_created" } else { "ready" })
                .with_subject(config.auth.bootstrap_username.clone()),
        ));
        Ok(Self {
            config,
            state: Arc::new(state),
        })
    }

    /// Returns the route table bound to this server's state.
    #[must_use]
    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.state))
    }

    /// Returns the underlying store handle.
    #[must_use]
    pub fn store(&self) -> &SqliteStore {
        &self.state.store
    }

    /// Binds the configured address and serves until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let addr = self.config.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|_| ServerError::Transport("http bind failed".to_string()))?;
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(|_| ServerError::Transport("http server failed".to_string()))
    }
}

/// Selects the audit sink named by configuration.
fn audit_sink_from_config(config: &AutotowConfig) -> Result<Arc<dyn AuditSink>, ServerError> {
    if !config.audit.enabled {
        return Ok(Arc::new(NoopAuditSink));
    }
    match &config.audit.path {
        Some(path) => {
            let sink = FileAuditSink::new(std::path::Path::new(path))
                .map_err(|err| ServerError::Init(format!("audit log: {err}")))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(StderrAuditSink)),
    }
}

/// Warns when the bootstrap admin uses the built-in password.
fn emit_default_password_warning(username: &str) {
    let _ = writeln!(
        std::io::stderr(),
        "autotow: WARNING: bootstrap account '{username}' uses the built-in default password; \
         set auth.bootstrap_password or AUTOTOW_ADMIN_PASSWORD"
    );
}

// ============================================================================
// SECTION: State
// ============================================================================

/// Shared state for HTTP handlers.
struct ServerState {
    /// `SQLite` store shared by every service.
    store: SqliteStore,
    /// Record upload service.
    ingest: IngestionService,
    /// Credential verification and registration.
    auth: Authenticator,
    /// Live sessions.
    sessions: SessionRegistry,
    /// Ad-hoc console executor.
    query: QueryExecutor,
    /// Public report projection.
    reports: ReportRenderer,
    /// Record listing for the dashboard.
    records: Arc<dyn RecordStore>,
    /// Destructive reset.
    admin: Arc<dyn StoreAdmin>,
    /// Audit event sink.
    audit: Arc<dyn AuditSink>,
    /// Account reseeded on startup and after reset.
    bootstrap: NewAccountRequest,
    /// Adds `Secure` to session cookies.
    cookie_secure: bool,
    /// Maximum accepted request body size.
    max_body_bytes: usize,
    /// Records raw console text in audit events.
    log_query_text: bool,
}

/// Opens the store and assembles handler state.
fn build_server_state(
    config: &AutotowConfig,
    audit: Arc<dyn AuditSink>,
) -> Result<ServerState, ServerError> {
    let store = SqliteStore::new(config.store_config())
        .map_err(|err| ServerError::Init(err.to_string()))?;
    let shared = Arc::new(store.clone());
    let records: Arc<dyn RecordStore> = shared.clone();
    let credentials: Arc<dyn CredentialStore> = shared.clone();
    let console: Arc<dyn SqlConsole> = shared.clone();
    let admin: Arc<dyn StoreAdmin> = shared;
    let secret_key = config.auth.secret_key.clone().unwrap_or_else(generate_secret_key);
    Ok(ServerState {
        store,
        ingest: IngestionService::new(Arc::clone(&records)),
        auth: Authenticator::new(credentials),
        sessions: SessionRegistry::with_limits(
            &secret_key,
            config.session_ttl(),
            config.auth.max_sessions,
        ),
        query: QueryExecutor::with_limit(console, config.query.max_query_bytes),
        reports: ReportRenderer::new(Arc::clone(&records)),
        records,
        admin,
        audit,
        bootstrap: NewAccountRequest {
            username: config.auth.bootstrap_username.clone(),
            password: config.auth.bootstrap_password.clone(),
            role: Some(Role::Admin),
        },
        cookie_secure: config.auth.cookie_secure,
        max_body_bytes: config.server.max_body_bytes,
        log_query_text: config.audit.log_query_text,
    })
}

/// Generates a per-process session secret.
fn generate_secret_key() -> String {
    let mut bytes = [0u8; GENERATED_SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Builds the route table.
fn build_router(state: Arc<ServerState>) -> Router {
    let max_body_bytes = state.max_body_bytes;
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/api/upload", post(upload))
        .route("/api/register", post(register))
        .route("/api/records", get(api_records))
        .route("/login", get(login_form).post(login))
        .route("/logout", get(logout).post(logout))
        .route("/dashboard", get(dashboard))
        .route("/dashboard/query", post(dashboard_query))
        .route("/view/{uuid}", get(view_report))
        .route("/admin/reset", post(admin_reset))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

// ============================================================================
// SECTION: Blocking Bridge
// ============================================================================

/// Runs store-bound work, shifting to a blocking context when available.
fn run_blocking<T>(operation: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(operation)
        }
        _ => operation(),
    }
}

// ============================================================================
// SECTION: Sessions
// ============================================================================

/// Extracts the session cookie value from request headers.
fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
}

/// Resolves the request's session principal with its current role.
///
/// Sessions whose account has disappeared are revoked; store failures fail
/// closed.
fn session_principal(state: &ServerState, headers: &HeaderMap) -> Option<Principal> {
    let cookie = session_cookie(headers)?;
    let principal = state.sessions.resolve(cookie)?;
    match run_blocking(|| state.auth.refresh(&principal)) {
        Ok(Some(current)) => Some(current),
        Ok(None) => {
            state.sessions.revoke(cookie);
            None
        }
        Err(_) => None,
    }
}

/// Builds the `Set-Cookie` value that starts a session.
fn session_set_cookie(value: &str, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!("{SESSION_COOKIE}={value}; HttpOnly; SameSite=Lax; Path=/{secure}")
}

/// Builds the `Set-Cookie` value that clears the session.
fn session_clear_cookie(secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0{secure}")
}

// ============================================================================
// SECTION: JSON Helpers
// ============================================================================

/// Builds a `{"status":"error","error":..}` response.
fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"status": "error", "error": message}))).into_response()
}

/// Maps a service failure to a JSON error response.
fn service_error_json(error: &ServiceError) -> Response {
    match error {
        ServiceError::Validation(message) => json_error(StatusCode::BAD_REQUEST, message),
        ServiceError::Unauthenticated | ServiceError::InvalidCredentials => {
            json_error(StatusCode::UNAUTHORIZED, "authentication required")
        }
        ServiceError::Forbidden(message) => json_error(StatusCode::FORBIDDEN, message),
        ServiceError::DuplicateKey(message) => json_error(StatusCode::CONFLICT, message),
        ServiceError::NotFound(message) => json_error(StatusCode::NOT_FOUND, message),
        ServiceError::Store(_) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "store error"),
    }
}

// ============================================================================
// SECTION: Public Handlers
// ============================================================================

/// Sends visitors to the dashboard.
async fn index() -> Redirect {
    Redirect::to("/dashboard")
}

/// Liveness check.
async fn healthz(State(state): State<Arc<ServerState>>) -> Response {
    match run_blocking(|| state.store.check_connection()) {
        Ok(()) => (StatusCode::OK, "ok").into_response(),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable").into_response(),
    }
}

/// Accepts one record upload.
async fn upload(State(state): State<Arc<ServerState>>, bytes: Bytes) -> Response {
    if bytes.len() > state.max_body_bytes {
        return json_error(StatusCode::PAYLOAD_TOO_LARGE, "request body too large");
    }
    let result = run_blocking(|| state.ingest.ingest_bytes(&bytes));
    match result {
        Ok(receipt) => {
            state.audit.record(&AuditEvent::new(
                "ingest",
                AuditEventParams::outcome(receipt.status.as_str())
                    .with_subject(receipt.external_id.as_str()),
            ));
            let status = match receipt.status {
                IngestStatus::Created => "success",
                IngestStatus::Duplicate => "exists",
            };
            (StatusCode::OK, Json(json!({"status": status, "id": receipt.external_id.as_str()})))
                .into_response()
        }
        Err(err) => {
            state
                .audit
                .record(&AuditEvent::new("ingest", AuditEventParams::outcome(err.kind_label())));
            service_error_json(&err)
        }
    }
}

/// Public report page.
async fn view_report(
    State(state): State<Arc<ServerState>>,
    Path(external_id): Path<String>,
) -> Response {
    match run_blocking(|| state.reports.render_report(&external_id)) {
        Ok(view) => Html(pages::report_page(&view)).into_response(),
        Err(ServiceError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, Html(pages::not_found_page(&external_id))).into_response()
        }
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(pages::message_page("Service Unavailable", "The report could not be loaded.")),
        )
            .into_response(),
    }
}

// ============================================================================
// SECTION: Login
// ============================================================================

/// Login form fields.
#[derive(Debug, Deserialize)]
struct LoginForm {
    /// Submitted username.
    #[serde(default)]
    username: String,
    /// Submitted password.
    #[serde(default)]
    password: String,
}

/// Renders the login form.
async fn login_form() -> Html<String> {
    Html(pages::login_page(None))
}

/// Verifies credentials and starts a session.
async fn login(State(state): State<Arc<ServerState>>, Form(form): Form<LoginForm>) -> Response {
    let result = run_blocking(|| state.auth.login(&form.username, &form.password));
    let principal = match result {
        Ok(principal) => principal,
        Err(err) => {
            state.audit.record(&AuditEvent::new(
                "login",
                AuditEventParams::outcome(err.kind_label()).with_subject(form.username.clone()),
            ));
            return match err {
                ServiceError::Store(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html(pages::login_page(Some("Sign-in is temporarily unavailable."))),
                )
                    .into_response(),
                _ => (
                    StatusCode::UNAUTHORIZED,
                    Html(pages::login_page(Some("Invalid username or password."))),
                )
                    .into_response(),
            };
        }
    };
    let cookie = match state.sessions.issue(principal.clone()) {
        Ok(cookie) => cookie,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(pages::login_page(Some("Sign-in is temporarily unavailable."))),
            )
                .into_response();
        }
    };
    state
        .audit
        .record(&AuditEvent::new("login", AuditEventParams::outcome("success").with_principal(&principal)));
    (
        [(SET_COOKIE, session_set_cookie(&cookie, state.cookie_secure))],
        Redirect::to("/dashboard"),
    )
        .into_response()
}

/// Ends the session and clears the cookie.
async fn logout(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    if let Some(cookie) = session_cookie(&headers) {
        let principal = state.sessions.resolve(cookie);
        state.sessions.revoke(cookie);
        if let Some(principal) = principal {
            state.audit.record(&AuditEvent::new(
                "logout",
                AuditEventParams::outcome("success").with_principal(&principal),
            ));
        }
    }
    ([(SET_COOKIE, session_clear_cookie(state.cookie_secure))], Redirect::to("/login"))
        .into_response()
}

// ============================================================================
// SECTION: Session Handlers
// ============================================================================

/// Console form fields.
#[derive(Debug, Deserialize)]
struct QueryForm {
    /// Submitted statement text.
    #[serde(default)]
    query: String,
}

/// Renders the dashboard with an optional console result.
fn render_dashboard(
    state: &ServerState,
    principal: &Principal,
    query: Option<&str>,
    outcome: Option<&QueryOutcome>,
) -> Response {
    let listing: Result<Vec<ExperimentRecord>, String> =
        run_blocking(|| state.records.list_records()).map_err(|err| err.to_string());
    let (records, listing_error) = match &listing {
        Ok(records) => (records.as_slice(), None),
        Err(message) => (&[][..], Some(message.as_str())),
    };
    Html(pages::dashboard_page(&DashboardView {
        principal,
        records,
        listing_error,
        query,
        outcome,
    }))
    .into_response()
}

/// Records table and query console.
async fn dashboard(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    let Some(principal) = session_principal(&state, &headers) else {
        return Redirect::to("/login").into_response();
    };
    render_dashboard(&state, &principal, None, None)
}

/// Runs a console statement and re-renders the dashboard.
async fn dashboard_query(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Form(form): Form<QueryForm>,
) -> Response {
    let Some(principal) = session_principal(&state, &headers) else {
        return Redirect::to("/login").into_response();
    };
    let outcome = run_blocking(|| state.query.run_query(&principal, &form.query));
    let mut params = AuditEventParams::outcome(outcome.label())
        .with_principal(&principal)
        .with_query(&form.query, state.log_query_text);
    params.statement = Some(StatementKind::classify(&form.query).as_str());
    state.audit.record(&AuditEvent::new("query", params));
    render_dashboard(&state, &principal, Some(&form.query), Some(&outcome))
}

/// JSON listing of every record.
async fn api_records(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    if session_principal(&state, &headers).is_none() {
        return json_error(StatusCode::UNAUTHORIZED, "authentication required");
    }
    match run_blocking(|| state.records.list_records()) {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(_) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "store error"),
    }
}

// ============================================================================
// SECTION: Admin Handlers
// ============================================================================

/// Creates an account. Admin only.
async fn register(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    bytes: Bytes,
) -> Response {
    if bytes.len() > state.max_body_bytes {
        return json_error(StatusCode::PAYLOAD_TOO_LARGE, "request body too large");
    }
    let principal = match Authenticator::require_session(session_principal(&state, &headers)) {
        Ok(principal) => principal,
        Err(err) => return service_error_json(&err),
    };
    if let Err(err) = Authenticator::require_admin(&principal) {
        state.audit.record(&AuditEvent::new(
            "register",
            AuditEventParams::outcome(err.kind_label()).with_principal(&principal),
        ));
        return service_error_json(&err);
    }
    let request: NewAccountRequest = match serde_json::from_slice(&bytes) {
        Ok(request) => request,
        Err(_) => return json_error(StatusCode::BAD_REQUEST, "invalid registration payload"),
    };
    let requested = request.username.clone();
    let result = run_blocking(|| state.auth.register(request));
    let params = AuditEventParams::outcome(match &result {
        Ok(_) => "created",
        Err(err) => err.kind_label(),
    })
    .with_principal(&principal)
    .with_subject(requested);
    state.audit.record(&AuditEvent::new("register", params));
    match result {
        Ok(created) => (
            StatusCode::CREATED,
            Json(json!({
                "status": "success",
                "username": created.username.as_str(),
                "role": created.role.as_str(),
            })),
        )
            .into_response(),
        Err(err) => service_error_json(&err),
    }
}

/// Drops and recreates the store, reseeding the bootstrap admin. Admin only.
async fn admin_reset(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    let Some(principal) = session_principal(&state, &headers) else {
        return Redirect::to("/login").into_response();
    };
    if let Err(err) = Authenticator::require_admin(&principal) {
        state.audit.record(&AuditEvent::new(
            "reset",
            AuditEventParams::outcome(err.kind_label()).with_principal(&principal),
        ));
        return (
            StatusCode::FORBIDDEN,
            Html(pages::message_page("Forbidden", "Only administrators may reset the database.")),
        )
            .into_response();
    }
    let result = build_account(state.bootstrap.clone())
        .and_then(|seed| run_blocking(|| state.admin.reset(&seed)).map_err(ServiceError::from));
    let outcome = match &result {
        Ok(()) => "success",
        Err(err) => err.kind_label(),
    };
    state
        .audit
        .record(&AuditEvent::new("reset", AuditEventParams::outcome(outcome).with_principal(&principal)));
    match result {
        Ok(()) => {
            state.sessions.clear();
            ([(SET_COOKIE, session_clear_cookie(state.cookie_secure))], Redirect::to("/login"))
                .into_response()
        }
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(pages::message_page("Reset Failed", "The database could not be reset.")),
        )
            .into_response(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
