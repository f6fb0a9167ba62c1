use crate::error::CheckError;
use crate::http::{AcceptableSet, CallOutcome};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest body excerpt carried in a FAIL diagnostic
pub const BODY_PREVIEW_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Ok,
    Fail,
    Error,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Ok => "OK",
            Verdict::Fail => "FAIL",
            Verdict::Error => "ERROR",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub verdict: Verdict,
    pub status: Option<u16>,
    /// Truncated body, only kept for FAIL
    pub body_preview: Option<String>,
    pub diagnostic: String,
}

/// Judge an outcome against the call's acceptable set.
///
/// Depends on nothing but status presence, the status itself and the set.
pub fn classify(outcome: &CallOutcome, acceptable: &AcceptableSet) -> Classification {
    match outcome {
        CallOutcome::TransportFailure { error } => Classification {
            verdict: Verdict::Error,
            status: None,
            body_preview: None,
            diagnostic: CheckError::Transport(error.clone()).to_string(),
        },
        CallOutcome::Response { status, .. } if acceptable.contains(*status) => Classification {
            verdict: Verdict::Ok,
            status: Some(*status),
            body_preview: None,
            diagnostic: format!("-> {}", status),
        },
        CallOutcome::Response { status, body } => {
            let preview = truncate_body(body, BODY_PREVIEW_CHARS);
            let diagnostic = CheckError::UnexpectedStatus {
                status: *status,
                body: preview.clone(),
            }
            .to_string();
            Classification {
                verdict: Verdict::Fail,
                status: Some(*status),
                body_preview: Some(preview),
                diagnostic,
            }
        }
    }
}

/// First `max_chars` characters of `body`, never splitting a code point
pub fn truncate_body(body: &str, max_chars: usize) -> String {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => body[..idx].to_string(),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> CallOutcome {
        CallOutcome::Response {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_status_in_set_is_ok() {
        let c = classify(&response(204, ""), &AcceptableSet::success());
        assert_eq!(c.verdict, Verdict::Ok);
        assert_eq!(c.diagnostic, "-> 204");
    }

    #[test]
    fn test_status_outside_set_is_fail_with_body() {
        let c = classify(&response(500, "boom"), &AcceptableSet::success());
        assert_eq!(c.verdict, Verdict::Fail);
        assert_eq!(c.status, Some(500));
        assert_eq!(c.diagnostic, "-> 500: boom");
    }

    #[test]
    fn test_transport_failure_is_error_for_any_set() {
        let outcome = CallOutcome::TransportFailure {
            error: "dns failure".to_string(),
        };
        for set in [
            AcceptableSet::success(),
            AcceptableSet::only(403),
            AcceptableSet::of(&[]),
        ] {
            let c = classify(&outcome, &set);
            assert_eq!(c.verdict, Verdict::Error);
            assert!(c.diagnostic.contains("dns failure"));
        }
    }

    #[test]
    fn test_forbidden_probe() {
        let probe = AcceptableSet::only(403);
        assert_eq!(classify(&response(403, ""), &probe).verdict, Verdict::Ok);
        assert_eq!(classify(&response(200, "[]"), &probe).verdict, Verdict::Fail);
    }

    #[test]
    fn test_business_rejection_tolerated() {
        let set = AcceptableSet::of(&[200, 400, 403, 409]);
        assert_eq!(classify(&response(409, ""), &set).verdict, Verdict::Ok);
        assert_eq!(classify(&response(404, ""), &set).verdict, Verdict::Fail);
    }

    #[test]
    fn test_body_preview_is_bounded() {
        let body = "ż".repeat(BODY_PREVIEW_CHARS + 50);
        let c = classify(&response(500, &body), &AcceptableSet::success());
        let preview = c.body_preview.unwrap();
        assert_eq!(preview.chars().count(), BODY_PREVIEW_CHARS);
    }

    #[test]
    fn test_truncate_short_body_untouched() {
        assert_eq!(truncate_body("short", 300), "short");
        assert_eq!(truncate_body("abcdef", 3), "abc");
    }
}
