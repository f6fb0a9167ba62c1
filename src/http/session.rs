use super::transport::HttpTransport;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identity a session acts as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Public,
    Reader,
    Admin,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::Public => "PUBLIC",
            Role::Reader => "READER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn requires_auth(&self) -> bool {
        !matches!(self, Role::Public)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Bearer token obtained from a successful login
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Connection context scoped to one role.
///
/// The descriptor itself never changes: attaching a credential produces a new
/// session that shares the same transport.
#[derive(Clone)]
pub struct RoleSession {
    role: Role,
    transport: Arc<dyn HttpTransport>,
    credential: Option<Credential>,
}

impl RoleSession {
    pub fn new(role: Role, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            role,
            transport,
            credential: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn transport(&self) -> &dyn HttpTransport {
        self.transport.as_ref()
    }

    /// Same session with `credential` replacing any earlier one
    pub fn with_credential(&self, credential: Credential) -> Self {
        Self {
            role: self.role,
            transport: Arc::clone(&self.transport),
            credential: Some(credential),
        }
    }
}

impl fmt::Debug for RoleSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleSession")
            .field("role", &self.role)
            .field("credential", &self.credential)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::transport::fake::ScriptedTransport;

    #[test]
    fn test_with_credential_overwrites_and_keeps_original() {
        let base = RoleSession::new(Role::Reader, ScriptedTransport::new());
        let first = base.with_credential(Credential::new("one"));
        let second = first.with_credential(Credential::new("two"));

        assert!(base.credential().is_none());
        assert_eq!(first.credential().unwrap().as_str(), "one");
        assert_eq!(second.credential().unwrap().bearer_header(), "Bearer two");
        assert_eq!(second.role(), Role::Reader);
    }

    #[test]
    fn test_credential_debug_is_masked() {
        let session = RoleSession::new(Role::Admin, ScriptedTransport::new())
            .with_credential(Credential::new("secret-token"));
        let printed = format!("{:?}", session);
        assert!(!printed.contains("secret-token"));
        assert!(printed.contains("***"));
    }
}
