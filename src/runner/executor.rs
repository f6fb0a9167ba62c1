use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::{debug, warn};
use uuid::Uuid;

use super::capture::{inspect_first_content_id, Captures, Identifier};
use super::classifier::{classify, truncate_body, Verdict, BODY_PREVIEW_CHARS};
use super::events::{CheckEvent, EventEmitter};
use super::scenario::{Base, PhaseDef, StepDef};
use super::session::{authenticate, join_url, AuthError, LOGIN_PATH};
use super::state::{PhaseState, RunState, StepState, StepStatus};
use crate::error::CheckError;
use crate::http::{
    execute, CallOutcome, CallSpec, HttpTransport, ReqwestTransport, Role, RoleSession,
};
use crate::utils::config::Config;

/// One session per role, each with its own connection context
pub struct SessionSet {
    pub public: RoleSession,
    pub reader: RoleSession,
    pub admin: RoleSession,
}

impl SessionSet {
    pub fn connect(timeout: Duration) -> Result<Self> {
        let transport = |role: Role| -> Result<RoleSession> {
            let t: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(timeout)?);
            Ok(RoleSession::new(role, t))
        };
        Ok(Self {
            public: transport(Role::Public)?,
            reader: transport(Role::Reader)?,
            admin: transport(Role::Admin)?,
        })
    }

    /// All roles sharing one transport
    pub fn shared(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            public: RoleSession::new(Role::Public, Arc::clone(&transport)),
            reader: RoleSession::new(Role::Reader, Arc::clone(&transport)),
            admin: RoleSession::new(Role::Admin, transport),
        }
    }

    pub fn for_role(&self, role: Role) -> &RoleSession {
        match role {
            Role::Public => &self.public,
            Role::Reader => &self.reader,
            Role::Admin => &self.admin,
        }
    }
}

/// Runs the scenario phases in order and records one status per step
pub struct ScenarioRunner {
    config: Config,
    sessions: SessionSet,
    emitter: EventEmitter,
    run: RunState,
}

impl ScenarioRunner {
    pub fn new(config: Config, sessions: SessionSet, emitter: EventEmitter) -> Self {
        let run = RunState::new(&Uuid::new_v4().to_string(), &config.base_url);
        Self {
            config,
            sessions,
            emitter,
            run,
        }
    }

    /// Execute every phase and hand back the finished run.
    ///
    /// Consumes the runner so the event stream closes once the run is over.
    pub async fn run(mut self, phases: &[PhaseDef]) -> RunState {
        self.run.start();
        self.emitter.emit(CheckEvent::RunStarted {
            run_id: self.run.run_id.clone(),
            base_url: self.config.base_url.clone(),
        });

        for def in phases {
            let phase = self.run_phase(def).await;
            self.run.add_phase(phase);
        }

        self.run.finish();
        self.emitter.emit(CheckEvent::RunFinished {
            summary: self.run.summary(),
        });
        self.run
    }

    async fn run_phase(&self, def: &PhaseDef) -> PhaseState {
        let needs_auth = def.role.requires_auth();

        let mut steps = Vec::with_capacity(def.steps.len() + 1);
        if needs_auth {
            steps.push(StepState::new(0, &format!("LOGIN {}", def.role), "POST"));
        }
        let first = steps.len();
        for (i, step) in def.steps.iter().enumerate() {
            steps.push(StepState::new(first + i, &step.name, step.method.as_str()));
        }

        let mut phase = PhaseState::new(&def.name, def.role, steps);

        self.emitter.emit(CheckEvent::PhaseStarted {
            phase: def.name.clone(),
            role: def.role,
            step_count: phase.steps.len(),
        });

        phase.start();

        let mut session = self.sessions.for_role(def.role).clone();

        if needs_auth {
            match self.login(&mut phase, &session).await {
                Ok(authenticated) => session = authenticated,
                Err(reason) => {
                    for index in first..phase.steps.len() {
                        self.skip(&mut phase, index, &reason);
                    }
                    return self.finish_phase(phase);
                }
            }
        }

        let mut captures = Captures::default();

        for (offset, step) in def.steps.iter().enumerate() {
            let index = first + offset;

            let id = match step.requires {
                Some(slot) => match captures.get(slot) {
                    Some(id) => Some(id.clone()),
                    None => {
                        let reason = CheckError::DependencyUnmet {
                            slot: slot.to_string(),
                        };
                        self.skip(&mut phase, index, &reason.to_string());
                        continue;
                    }
                },
                None => None,
            };

            let call = self.call_for(step, id.as_ref());
            let outcome = self.call(&mut phase, index, &session, &call).await;

            if let Some(slot) = step.captures {
                match (&outcome, outcome.body()) {
                    (CallOutcome::Response { status: 200, .. }, Some(body)) => {
                        match inspect_first_content_id(body) {
                            Ok(Some(id)) => {
                                debug!("Captured {} = {} from {}", slot, id, call.name);
                                captures.insert(slot, id);
                            }
                            Ok(None) => debug!("{} returned no items, no {}", call.name, slot),
                            Err(detail) => {
                                let err = CheckError::MalformedBody {
                                    source_step: call.name.clone(),
                                    detail,
                                };
                                warn!("{}", err);
                                self.emitter.emit(CheckEvent::Log {
                                    message: err.to_string(),
                                });
                            }
                        }
                    }
                    _ => debug!("{} did not succeed, no {}", call.name, slot),
                }
            }
        }

        self.finish_phase(phase)
    }

    /// Log the phase's role in. `Err` carries the reason every remaining step
    /// is skipped with.
    async fn login(
        &self,
        phase: &mut PhaseState,
        session: &RoleSession,
    ) -> std::result::Result<RoleSession, String> {
        let role = session.role();
        phase.begin_auth();

        let failure = |e: AuthError| {
            CheckError::Authentication {
                role: role.to_string(),
                reason: e.to_string(),
            }
            .to_string()
        };

        let Some(credentials) = self.config.credentials_for(role) else {
            let reason = failure(AuthError::NotConfigured);
            self.skip(phase, 0, &reason);
            return Err(self.auth_failed(phase, role, reason));
        };

        self.start_step(phase, 0, &join_url(&self.config.base_url, LOGIN_PATH));
        let attempt = authenticate(
            session,
            &self.config.base_url,
            credentials,
            self.config.timeout(),
        )
        .await;

        match attempt.result {
            Ok(credential) => {
                self.record(phase, 0, &attempt.call, &attempt.outcome);
                phase.auth_succeeded();
                Ok(session.with_credential(credential))
            }
            Err(e) => {
                let reason = failure(e);
                let classification = classify(&attempt.outcome, &attempt.call.acceptable);
                match (classification.verdict, &attempt.outcome) {
                    // accepted status but no usable token
                    (Verdict::Ok, CallOutcome::Response { status, body }) => {
                        let status = StepStatus::Fail {
                            status: *status,
                            body: truncate_body(body, BODY_PREVIEW_CHARS),
                            message: reason.clone(),
                        };
                        self.settle(phase, 0, &attempt.call.name, status, reason.clone());
                    }
                    _ => self.record(phase, 0, &attempt.call, &attempt.outcome),
                }
                Err(self.auth_failed(phase, role, reason))
            }
        }
    }

    fn auth_failed(&self, phase: &mut PhaseState, role: Role, reason: String) -> String {
        phase.auth_failed(&reason);
        self.emitter.emit(CheckEvent::AuthFailed {
            phase: phase.name.clone(),
            role,
            reason: reason.clone(),
        });
        reason
    }

    fn call_for(&self, step: &StepDef, id: Option<&Identifier>) -> CallSpec {
        let base = match step.base {
            Base::Api => &self.config.base_url,
            Base::Root => &self.config.root_url,
        };
        CallSpec::new(
            step.method.clone(),
            join_url(base, &step.resolve_path(id)),
            step.name.clone(),
        )
        .with_body(step.body.clone())
        .accepting(step.acceptable.clone())
    }

    async fn call(
        &self,
        phase: &mut PhaseState,
        index: usize,
        session: &RoleSession,
        call: &CallSpec,
    ) -> CallOutcome {
        self.start_step(phase, index, &call.url);
        let outcome = execute(session, call, self.config.timeout()).await;
        self.record(phase, index, call, &outcome);
        outcome
    }

    fn start_step(&self, phase: &mut PhaseState, index: usize, url: &str) {
        let phase_name = phase.name.clone();
        if let Some(step) = phase.step(index) {
            step.start(url);
            self.emitter.emit(CheckEvent::StepStarted {
                phase: phase_name,
                index,
                name: step.name.clone(),
            });
        }
    }

    fn record(&self, phase: &mut PhaseState, index: usize, call: &CallSpec, outcome: &CallOutcome) {
        let classification = classify(outcome, &call.acceptable);
        let status = StepStatus::from_classification(&classification);
        self.settle(phase, index, &call.name, status, classification.diagnostic);
    }

    fn settle(
        &self,
        phase: &mut PhaseState,
        index: usize,
        name: &str,
        status: StepStatus,
        diagnostic: String,
    ) {
        let phase_name = phase.name.clone();
        if let Some(step) = phase.step(index) {
            step.record(status);
            if let Some(verdict) = step.status.verdict() {
                self.emitter.emit(CheckEvent::StepFinished {
                    phase: phase_name,
                    index,
                    name: name.to_string(),
                    verdict,
                    diagnostic,
                    duration_ms: step.duration_ms.unwrap_or(0),
                });
            }
        }
    }

    fn skip(&self, phase: &mut PhaseState, index: usize, reason: &str) {
        let phase_name = phase.name.clone();
        if let Some(step) = phase.step(index) {
            step.skip(reason);
            self.emitter.emit(CheckEvent::StepSkipped {
                phase: phase_name,
                index,
                name: step.name.clone(),
                reason: reason.to_string(),
            });
        }
    }

    fn finish_phase(&self, mut phase: PhaseState) -> PhaseState {
        phase.finish();
        self.emitter.emit(CheckEvent::PhaseFinished {
            phase: phase.name.clone(),
            status: phase.status.clone(),
            duration_ms: phase.total_duration_ms,
        });
        phase
    }
}
