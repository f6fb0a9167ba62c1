use reqwest::Method;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// Status codes a call treats as non-failing.
///
/// Many endpoints correctly reject an action under valid preconditions
/// (returning an already-returned loan, cancelling a cancelled penalty), so a
/// call carries a set rather than a single expected code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptableSet(BTreeSet<u16>);

impl AcceptableSet {
    /// `{200, 201, 204}`
    pub fn success() -> Self {
        Self::of(&[200, 201, 204])
    }

    pub fn only(code: u16) -> Self {
        Self::of(&[code])
    }

    pub fn of(codes: &[u16]) -> Self {
        Self(codes.iter().copied().collect())
    }

    pub fn contains(&self, status: u16) -> bool {
        self.0.contains(&status)
    }

    pub fn codes(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.iter().copied()
    }
}

impl Default for AcceptableSet {
    fn default() -> Self {
        Self::success()
    }
}

impl fmt::Display for AcceptableSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codes: Vec<String> = self.codes().map(|c| c.to_string()).collect();
        write!(f, "{{{}}}", codes.join(", "))
    }
}

/// One concrete call: resolved URL, display name and what counts as success
#[derive(Debug, Clone)]
pub struct CallSpec {
    pub method: Method,
    pub url: String,
    pub name: String,
    pub body: Option<Value>,
    pub acceptable: AcceptableSet,
}

impl CallSpec {
    pub fn new(method: Method, url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            name: name.into(),
            body: None,
            acceptable: AcceptableSet::default(),
        }
    }

    pub fn with_body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    pub fn accepting(mut self, acceptable: AcceptableSet) -> Self {
        self.acceptable = acceptable;
        self
    }
}

/// Normalized result of sending a call
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Response { status: u16, body: String },
    TransportFailure { error: String },
}

impl CallOutcome {
    pub fn status(&self) -> Option<u16> {
        match self {
            CallOutcome::Response { status, .. } => Some(*status),
            CallOutcome::TransportFailure { .. } => None,
        }
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            CallOutcome::Response { body, .. } => Some(body),
            CallOutcome::TransportFailure { .. } => None,
        }
    }
}
