use super::call::{CallOutcome, CallSpec};
use super::session::RoleSession;
use super::transport::{HttpRequest, TransportError};
use log::debug;
use std::time::Duration;

/// Send one call through `session`.
///
/// Never fails: anything that keeps a response from arriving is folded into
/// `CallOutcome::TransportFailure`. The timeout bounds the whole exchange no
/// matter which transport the session uses.
pub async fn execute(session: &RoleSession, call: &CallSpec, timeout: Duration) -> CallOutcome {
    let mut headers = Vec::new();
    if let Some(credential) = session.credential() {
        headers.push(("Authorization".to_string(), credential.bearer_header()));
    }

    let request = HttpRequest {
        method: call.method.clone(),
        url: call.url.clone(),
        headers,
        json: call.body.clone(),
    };

    debug!("{} {} {}", session.role(), call.method, call.url);

    let sent = tokio::time::timeout(timeout, session.transport().send(request, timeout)).await;
    let outcome = match sent {
        Ok(Ok(response)) => CallOutcome::Response {
            status: response.status,
            body: response.body,
        },
        Ok(Err(e)) => CallOutcome::TransportFailure {
            error: e.to_string(),
        },
        Err(_) => CallOutcome::TransportFailure {
            error: TransportError::Timeout(timeout).to_string(),
        },
    };

    match &outcome {
        CallOutcome::Response { status, .. } => debug!("{} -> {}", call.url, status),
        CallOutcome::TransportFailure { error } => debug!("{} -> {}", call.url, error),
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::session::{Credential, Role};
    use crate::http::transport::fake::{Reply, ScriptedTransport};
    use reqwest::Method;

    const URL: &str = "http://api.test/api/books";

    #[tokio::test]
    async fn test_attaches_bearer_when_authenticated() {
        let transport = ScriptedTransport::new();
        transport.on("GET", URL, Reply::Status(200, "[]".to_string()));
        let session = RoleSession::new(Role::Reader, transport.clone())
            .with_credential(Credential::new("abc"));

        let call = CallSpec::new(Method::GET, URL, "GET /books");
        let outcome = execute(&session, &call, Duration::from_secs(1)).await;

        assert_eq!(outcome.status(), Some(200));
        let sent = transport.requests();
        assert_eq!(
            sent[0].headers,
            vec![("Authorization".to_string(), "Bearer abc".to_string())]
        );
    }

    #[tokio::test]
    async fn test_anonymous_session_sends_no_auth_header() {
        let transport = ScriptedTransport::new();
        let session = RoleSession::new(Role::Public, transport.clone());

        let call = CallSpec::new(Method::GET, URL, "GET /books");
        execute(&session, &call, Duration::from_secs(1)).await;

        assert!(transport.requests()[0].headers.is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_becomes_failure_outcome() {
        let transport = ScriptedTransport::new();
        transport.on("GET", URL, Reply::Fail("connection refused".to_string()));
        let session = RoleSession::new(Role::Public, transport);

        let call = CallSpec::new(Method::GET, URL, "GET /books");
        let outcome = execute(&session, &call, Duration::from_secs(1)).await;

        match outcome {
            CallOutcome::TransportFailure { error } => assert!(error.contains("refused")),
            other => panic!("expected transport failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_hanging_transport_is_cut_off() {
        let transport = ScriptedTransport::new();
        transport.on("GET", URL, Reply::Hang);
        let session = RoleSession::new(Role::Public, transport);

        let call = CallSpec::new(Method::GET, URL, "GET /books");
        let outcome = execute(&session, &call, Duration::from_millis(20)).await;

        match outcome {
            CallOutcome::TransportFailure { error } => assert!(error.contains("timed out")),
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
