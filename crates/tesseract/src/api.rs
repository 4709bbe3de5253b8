//! Request API: registration, login, and token inspection over HTTP.
//!
//! All three routes are `GET` with query parameters. An empty parameter
//! counts as missing, and so does a query string that doesn't parse (a
//! repeated key, for instance): every 400 carries an `{error}` body.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use serde::Deserialize;
use serde_json::{Value, json};
use tesseract_auth::{AuthError, CredentialStore};
use tesseract_protocol::Codec;

use crate::server::ServerState;

const MISSING_CREDENTIALS: &str = "username and password fields required.";
const MISSING_TOKEN: &str = "'token' field required";
const INVALID_LOGIN: &str = "invalid login";
const INVALID_TOKEN: &str = "invalid token";
const STORE_UNAVAILABLE: &str = "credential store unavailable";

type ApiResponse = (StatusCode, Json<Value>);

/// Query parameters for `/api/register` and `/api/authenticate`.
#[derive(Debug, Default, Deserialize)]
struct CredentialsQuery {
    username: Option<String>,
    password: Option<String>,
}

/// Query parameters for `/api/checktoken`.
#[derive(Debug, Default, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Builds the request API router over shared server state.
pub(crate) fn router<S, C>(state: Arc<ServerState<S, C>>) -> Router
where
    S: CredentialStore,
    C: Codec,
{
    Router::new()
        .route("/api/register", get(register::<S, C>))
        .route("/api/authenticate", get(authenticate::<S, C>))
        .route("/api/checktoken", get(check_token::<S, C>))
        .with_state(state)
}

/// GET /api/register
async fn register<S, C>(
    State(state): State<Arc<ServerState<S, C>>>,
    query: Result<Query<CredentialsQuery>, QueryRejection>,
) -> ApiResponse
where
    S: CredentialStore,
    C: Codec,
{
    let Some((username, password)) = credentials(query) else {
        return error(StatusCode::BAD_REQUEST, MISSING_CREDENTIALS);
    };

    match state.verifier.register(&username, &password).await {
        Ok(success) => (StatusCode::OK, Json(json!({ "success": success }))),
        Err(e) => store_failure(&e),
    }
}

/// GET /api/authenticate
async fn authenticate<S, C>(
    State(state): State<Arc<ServerState<S, C>>>,
    query: Result<Query<CredentialsQuery>, QueryRejection>,
) -> ApiResponse
where
    S: CredentialStore,
    C: Codec,
{
    let Some((username, password)) = credentials(query) else {
        return error(StatusCode::BAD_REQUEST, MISSING_CREDENTIALS);
    };

    match state.verifier.authenticate(&username, &password).await {
        Ok(Some(token)) => (StatusCode::OK, Json(json!({ "token": token }))),
        Ok(None) => error(StatusCode::BAD_REQUEST, INVALID_LOGIN),
        Err(e) => store_failure(&e),
    }
}

/// GET /api/checktoken
async fn check_token<S, C>(
    State(state): State<Arc<ServerState<S, C>>>,
    query: Result<Query<TokenQuery>, QueryRejection>,
) -> ApiResponse
where
    S: CredentialStore,
    C: Codec,
{
    let Some(token) = parsed(query).and_then(|q| present(q.token)) else {
        return error(StatusCode::BAD_REQUEST, MISSING_TOKEN);
    };

    match state.tokens.verify(&token) {
        Ok(claim) => (
            StatusCode::OK,
            Json(json!({ "username": claim.username, "exp": claim.exp })),
        ),
        Err(e) => {
            tracing::debug!(error = %e, "checktoken rejected");
            error(StatusCode::BAD_REQUEST, INVALID_TOKEN)
        }
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parsed<T>(query: Result<Query<T>, QueryRejection>) -> Option<T> {
    match query {
        Ok(Query(query)) => Some(query),
        Err(e) => {
            tracing::debug!(error = %e, "unparseable query string");
            None
        }
    }
}

fn credentials(
    query: Result<Query<CredentialsQuery>, QueryRejection>,
) -> Option<(String, String)> {
    let query = parsed(query)?;
    Some((present(query.username)?, present(query.password)?))
}

fn error(status: StatusCode, message: &str) -> ApiResponse {
    (status, Json(json!({ "error": message })))
}

fn store_failure(e: &AuthError) -> ApiResponse {
    tracing::error!(error = %e, "credential store failure");
    error(StatusCode::SERVICE_UNAVAILABLE, STORE_UNAVAILABLE)
}
