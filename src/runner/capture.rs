use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Named places a step can store an identifier for later steps of its phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Slot {
    BookId,
    ReaderLoanId,
    UserId,
    AdminLoanId,
    PenaltyId,
}

impl Slot {
    pub fn label(&self) -> &'static str {
        match self {
            Slot::BookId => "bookId",
            Slot::ReaderLoanId => "loanId (reader)",
            Slot::UserId => "userId",
            Slot::AdminLoanId => "loanId (admin)",
            Slot::PenaltyId => "penaltyId",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Scalar read out of a response body, rendered the way it goes into a path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identifier(String);

impl Identifier {
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self(n.to_string())),
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Look up `content[0].id` in a paginated list body.
///
/// `Ok(None)` means the page was well formed but empty. `Err` describes why
/// the body could not be read.
pub fn inspect_first_content_id(body: &str) -> Result<Option<Identifier>, String> {
    let page: Value = serde_json::from_str(body).map_err(|e| format!("invalid JSON: {}", e))?;

    let content = match page.get("content") {
        Some(Value::Array(items)) => items,
        Some(_) => return Err("\"content\" is not an array".to_string()),
        None => return Err("missing \"content\" field".to_string()),
    };

    let Some(first) = content.first() else {
        return Ok(None);
    };

    match first.get("id") {
        Some(id) => Identifier::from_json(id)
            .map(Some)
            .ok_or_else(|| format!("unusable id value: {}", id)),
        None => Err("first element has no \"id\"".to_string()),
    }
}

/// Identifiers captured so far in the current phase
#[derive(Debug, Default)]
pub struct Captures {
    values: HashMap<Slot, Identifier>,
}

impl Captures {
    pub fn get(&self, slot: Slot) -> Option<&Identifier> {
        self.values.get(&slot)
    }

    pub fn insert(&mut self, slot: Slot, id: Identifier) {
        self.values.insert(slot, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_id() {
        let id = inspect_first_content_id(r#"{"content":[{"id":42},{"id":7}],"totalElements":2}"#);
        assert_eq!(id, Ok(Some(Identifier("42".to_string()))));
    }

    #[test]
    fn test_string_id() {
        let id = inspect_first_content_id(r#"{"content":[{"id":"a-1"}]}"#);
        assert_eq!(id.unwrap().unwrap().as_str(), "a-1");
    }

    #[test]
    fn test_empty_content_is_not_an_error() {
        assert_eq!(inspect_first_content_id(r#"{"content":[]}"#), Ok(None));
    }

    #[test]
    fn test_malformed_bodies_yield_nothing() {
        for body in [
            "<html>",
            "",
            r#"{"items":[]}"#,
            r#"{"content":{}}"#,
            r#"{"content":[{"name":"x"}]}"#,
            r#"{"content":[{"id":null}]}"#,
            r#"[1,2,3]"#,
        ] {
            assert!(inspect_first_content_id(body).is_err(), "{}", body);
        }
    }

    #[test]
    fn test_captures_are_per_slot() {
        let mut captures = Captures::default();
        captures.insert(Slot::UserId, Identifier("3".to_string()));
        assert!(captures.get(Slot::UserId).is_some());
        assert!(captures.get(Slot::PenaltyId).is_none());
    }
}
