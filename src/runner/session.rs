use crate::http::{execute, AcceptableSet, CallOutcome, CallSpec, Credential, RoleSession};
use crate::utils::config::Credentials;
use reqwest::Method;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

pub const LOGIN_PATH: &str = "/auth/login";

/// Field of the login response holding the bearer token
pub const TOKEN_FIELD: &str = "token";

/// Why a role ended up without a credential
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AuthError {
    #[error("no credentials configured")]
    NotConfigured,

    #[error("login got no response ({0})")]
    Transport(String),

    #[error("login rejected with status {0}")]
    Rejected(u16),

    #[error("login response did not contain a \"token\"")]
    MissingCredential,

    #[error("login response is not valid JSON: {0}")]
    MalformedBody(String),
}

/// The login call together with what came of it
#[derive(Debug)]
pub struct LoginAttempt {
    pub call: CallSpec,
    pub outcome: CallOutcome,
    pub result: Result<Credential, AuthError>,
}

pub fn login_call(base_url: &str, session: &RoleSession, credentials: &Credentials) -> CallSpec {
    CallSpec::new(
        Method::POST,
        join_url(base_url, LOGIN_PATH),
        format!("LOGIN {}", session.role()),
    )
    .with_body(Some(json!({
        "email": credentials.email,
        "password": credentials.password,
    })))
    .accepting(AcceptableSet::only(200))
}

/// Log in as the session's role.
///
/// The caller attaches the credential with `RoleSession::with_credential`;
/// calling this again just yields a fresh credential to attach.
pub async fn authenticate(
    session: &RoleSession,
    base_url: &str,
    credentials: &Credentials,
    timeout: Duration,
) -> LoginAttempt {
    let call = login_call(base_url, session, credentials);
    let outcome = execute(session, &call, timeout).await;

    let result = match &outcome {
        CallOutcome::TransportFailure { error } => Err(AuthError::Transport(error.clone())),
        CallOutcome::Response { status: 200, body } => token_from_body(body),
        CallOutcome::Response { status, .. } => Err(AuthError::Rejected(*status)),
    };

    if let Err(ref e) = result {
        log::warn!("{} login failed: {}", session.role(), e);
    }

    LoginAttempt {
        call,
        outcome,
        result,
    }
}

/// Pull the bearer token out of a 200 login body
pub fn token_from_body(body: &str) -> Result<Credential, AuthError> {
    let data: Value =
        serde_json::from_str(body).map_err(|e| AuthError::MalformedBody(e.to_string()))?;

    match data.get(TOKEN_FIELD).and_then(Value::as_str) {
        Some(token) if !token.is_empty() => Ok(Credential::new(token)),
        _ => Err(AuthError::MissingCredential),
    }
}

pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}
