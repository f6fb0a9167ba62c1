//! The fixed check scenario for the library API.
//!
//! Phases run in the order returned by [`build_scenario`]. Within a phase a
//! step may capture an identifier into a [`Slot`] and later steps of the same
//! phase may require it; `{id}` in a path is replaced with that identifier.

use super::capture::{Identifier, Slot};
use crate::http::{AcceptableSet, Role};
use crate::utils::config::{Config, StatsWindow};
use reqwest::Method;
use serde_json::{json, Value};

/// Placeholder replaced with the required identifier
pub const ID_PLACEHOLDER: &str = "{id}";

/// Success, or a business-rule rejection of a valid request
const TOLERATES_REJECTION: &[u16] = &[200, 400, 403, 409];

/// Which configured URL a step's path is relative to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base {
    Api,
    Root,
}

#[derive(Debug, Clone)]
pub struct StepDef {
    pub name: String,
    pub method: Method,
    pub base: Base,
    pub path: String,
    pub body: Option<Value>,
    pub acceptable: AcceptableSet,
    pub requires: Option<Slot>,
    pub captures: Option<Slot>,
}

impl StepDef {
    fn new(method: Method, path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method,
            base: Base::Api,
            path: path.into(),
            body: None,
            acceptable: AcceptableSet::success(),
            requires: None,
            captures: None,
        }
    }

    pub fn get(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(Method::GET, path, name)
    }

    pub fn post(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(Method::POST, path, name)
    }

    fn on_root(mut self) -> Self {
        self.base = Base::Root;
        self
    }

    fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    fn accepting(mut self, codes: &[u16]) -> Self {
        self.acceptable = AcceptableSet::of(codes);
        self
    }

    fn requires(mut self, slot: Slot) -> Self {
        self.requires = Some(slot);
        self
    }

    fn captures(mut self, slot: Slot) -> Self {
        self.captures = Some(slot);
        self
    }

    /// Path with the identifier filled in
    pub fn resolve_path(&self, id: Option<&Identifier>) -> String {
        match id {
            Some(id) => self.path.replace(ID_PLACEHOLDER, id.as_str()),
            None => self.path.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PhaseDef {
    pub name: String,
    pub role: Role,
    pub steps: Vec<StepDef>,
}

/// Every phase, in run order
pub fn build_scenario(config: &Config) -> Vec<PhaseDef> {
    let mut phases = Vec::new();
    if config.health_check {
        phases.push(health_phase());
    }
    phases.push(public_catalog_phase());
    phases.push(reader_phase());
    phases.push(admin_phase(&config.stats, &config.test_category));
    phases
}

pub fn health_phase() -> PhaseDef {
    PhaseDef {
        name: "HEALTH CHECK".to_string(),
        role: Role::Public,
        steps: vec![StepDef::get("/health", "PUBLIC /health").on_root()],
    }
}

pub fn public_catalog_phase() -> PhaseDef {
    PhaseDef {
        name: "PUBLIC CATALOG ENDPOINTS".to_string(),
        role: Role::Public,
        steps: vec![
            StepDef::get("/books?page=0&size=5", "GET /books (public)").captures(Slot::BookId),
            StepDef::get("/categories", "GET /categories (public)"),
            StepDef::get("/authors?page=0&size=5", "GET /authors (public)"),
            StepDef::get("/books/{id}", "GET /books/{id} (public)").requires(Slot::BookId),
            StepDef::get(
                "/books/{id}/availability",
                "GET /books/{id}/availability (public)",
            )
            .requires(Slot::BookId),
        ],
    }
}

pub fn reader_phase() -> PhaseDef {
    PhaseDef {
        name: "READER ENDPOINTS".to_string(),
        role: Role::Reader,
        steps: vec![
            StepDef::get("/auth/me", "READER GET /auth/me"),
            StepDef::get("/me/loans?page=0&size=10", "GET /me/loans"),
            StepDef::get("/me/loans/history?page=0&size=10", "GET /me/loans/history"),
            StepDef::get("/me/reservations?page=0&size=10", "GET /me/reservations"),
            StepDef::get("/me/penalties?page=0&size=10", "GET /me/penalties"),
            StepDef::get("/admin/users", "READER GET /admin/users (should be 403)")
                .accepting(&[403]),
            StepDef::get(
                "/admin/loans?page=0&size=10",
                "READER GET /admin/loans (should be 403)",
            )
            .accepting(&[403]),
            StepDef::get("/me/loans?page=0&size=5", "GET /me/loans (for extend)")
                .captures(Slot::ReaderLoanId),
            StepDef::post("/loans/{id}/extend", "POST /loans/{id}/extend")
                .body(json!({ "additionalDays": 7 }))
                .accepting(TOLERATES_REJECTION)
                .requires(Slot::ReaderLoanId),
        ],
    }
}

pub fn admin_phase(stats: &StatsWindow, test_category: &str) -> PhaseDef {
    PhaseDef {
        name: "ADMIN ENDPOINTS".to_string(),
        role: Role::Admin,
        steps: vec![
            StepDef::get("/auth/me", "ADMIN GET /auth/me"),
            StepDef::get("/admin/users?page=0&size=10", "GET /admin/users")
                .captures(Slot::UserId),
            StepDef::get("/admin/users/{id}", "GET /admin/users/{id}").requires(Slot::UserId),
            StepDef::get(
                "/admin/users/{id}/loans?page=0&size=10",
                "GET /admin/users/{id}/loans",
            )
            .requires(Slot::UserId),
            StepDef::get(
                "/admin/users/{id}/penalties?page=0&size=10",
                "GET /admin/users/{id}/penalties",
            )
            .requires(Slot::UserId),
            StepDef::get("/admin/loans?page=0&size=10", "GET /admin/loans")
                .captures(Slot::AdminLoanId),
            StepDef::get("/admin/reservations?page=0&size=10", "GET /admin/reservations"),
            StepDef::get("/admin/penalties?page=0&size=10", "GET /admin/penalties")
                .captures(Slot::PenaltyId),
            StepDef::post("/admin/loans/{id}/return", "POST /admin/loans/{id}/return")
                .accepting(TOLERATES_REJECTION)
                .requires(Slot::AdminLoanId),
            StepDef::post(
                "/admin/loans/{id}/mark-lost",
                "POST /admin/loans/{id}/mark-lost",
            )
            .body(json!({
                "createPenalty": false,
                "penaltyAmount": 0.0,
                "penaltyReason": "Test lost",
            }))
            .accepting(TOLERATES_REJECTION)
            .requires(Slot::AdminLoanId),
            StepDef::post(
                "/admin/penalties/{id}/mark-paid",
                "POST /admin/penalties/{id}/mark-paid",
            )
            .accepting(TOLERATES_REJECTION)
            .requires(Slot::PenaltyId),
            StepDef::post(
                "/admin/penalties/{id}/cancel",
                "POST /admin/penalties/{id}/cancel",
            )
            .accepting(TOLERATES_REJECTION)
            .requires(Slot::PenaltyId),
            StepDef::get(
                format!(
                    "/admin/stats/book-popularity?fromMonth={}&toMonth={}&limit={}",
                    stats.from_month, stats.to_month, stats.limit
                ),
                "GET /admin/stats/book-popularity",
            ),
            StepDef::get(
                format!("/admin/stats/loans-per-day?from={}&to={}", stats.from, stats.to),
                "GET /admin/stats/loans-per-day",
            ),
            StepDef::get(
                format!("/admin/stats/summary?from={}&to={}", stats.from, stats.to),
                "GET /admin/stats/summary",
            ),
            StepDef::post(
                "/admin/categories",
                "POST /admin/categories (create test category)",
            )
            .body(json!({ "name": test_category, "parentId": null }))
            .accepting(&[201, 400, 409]),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(v: Value) -> Identifier {
        Identifier::from_json(&v).unwrap()
    }

    #[test]
    fn test_phase_order_and_health_toggle() {
        let mut config = Config::default();
        let names: Vec<String> = build_scenario(&config).into_iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            vec![
                "HEALTH CHECK",
                "PUBLIC CATALOG ENDPOINTS",
                "READER ENDPOINTS",
                "ADMIN ENDPOINTS"
            ]
        );

        config.health_check = false;
        assert_eq!(build_scenario(&config)[0].role, Role::Public);
        assert_eq!(build_scenario(&config).len(), 3);
    }

    #[test]
    fn test_reader_phase_has_nine_steps_and_forbidden_probes() {
        let phase = reader_phase();
        assert_eq!(phase.steps.len(), 9);

        let probes: Vec<&StepDef> = phase
            .steps
            .iter()
            .filter(|s| s.path.starts_with("/admin/"))
            .collect();
        assert_eq!(probes.len(), 2);
        for probe in probes {
            assert_eq!(probe.acceptable, AcceptableSet::only(403));
        }
    }

    #[test]
    fn test_every_requirement_is_captured_earlier_in_phase() {
        for phase in build_scenario(&Config::default()) {
            let mut seen = Vec::new();
            for step in &phase.steps {
                if let Some(slot) = step.requires {
                    assert!(seen.contains(&slot), "{} needs {}", step.name, slot);
                    assert!(step.path.contains(ID_PLACEHOLDER));
                }
                if let Some(slot) = step.captures {
                    seen.push(slot);
                }
            }
        }
    }

    #[test]
    fn test_resolve_path_substitutes_identifier() {
        let step = StepDef::get("/books/{id}/availability", "x");
        assert_eq!(step.resolve_path(Some(&id(json!(42)))), "/books/42/availability");
        assert_eq!(step.resolve_path(None), "/books/{id}/availability");
    }

    #[test]
    fn test_stats_window_from_config() {
        let stats = StatsWindow {
            from: "2023-01-01".to_string(),
            to: "2023-06-30".to_string(),
            from_month: "2023-01-01".to_string(),
            to_month: "2023-06-01".to_string(),
            limit: 5,
        };
        let phase = admin_phase(&stats, "CI_CATEGORY");
        assert!(phase.steps.iter().any(|s| s.path
            == "/admin/stats/book-popularity?fromMonth=2023-01-01&toMonth=2023-06-01&limit=5"));
        assert!(phase
            .steps
            .iter()
            .any(|s| s.path == "/admin/stats/summary?from=2023-01-01&to=2023-06-30"));

        let create = phase.steps.last().unwrap();
        assert_eq!(create.body, Some(json!({"name": "CI_CATEGORY", "parentId": null})));
        assert_eq!(create.acceptable, AcceptableSet::of(&[201, 400, 409]));
    }
}
