// [apps/orchestrator/src/orchestrator/mod.rs]
/*!
 * =================================================================
 * APARATO: SUBJECT ORCHESTRATOR (V7.0 - INDEFINITE LIFETIME)
 * CLASIFICACIÓN: APPLICATION CORE (ESTRATO L1-APP)
 * RESPONSABILIDAD: MÁQUINA DE ESTADOS EXTERNA POR SUJETO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SINGLE-THREADED COOPERATION: Toda mutación del sujeto se serializa
 *    a través del buzón de directivas; los hijos son tareas hermanas
 *    que solo se comunican por mensajes tipados.
 * 2. JOURNAL-FIRST: Ningún mando se reconoce antes del commit de su
 *    evento; ninguna notificación precede al commit.
 * 3. DURABLE REPLAY: La rehidratación pliega el journal (desde el
 *    marcador de checkpoint) y re-registra las corridas vivas; los
 *    temporizadores de decaimiento se derivan siempre del journal.
 * 4. FATAL DIVERGENCE: Si la proyección en RAM diverge del re-pliegue
 *    completo, el orquestador se detiene antes que operar corrupto.
 * =================================================================
 */

mod directives;

pub use directives::{CommandEnvelope, QueryEnvelope, SubjectDirective};

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;
use veritas_domain_models::{
    CommandRejection, EventDraft, EventKind, FailureReason, ProtocolRun, ProtocolState,
    StartMethodReceipt, SubjectSnapshot, VerificationLevel, VerificationMethod,
};
use veritas_domain_scoring::catalog::{self, ProtocolFamily};
use veritas_domain_scoring::engine;
use veritas_domain_protocols::{
    execute_method, ProtocolContext, ProtocolOutcome, ProtocolSignal, SignalAck, SignalRejection,
};

use crate::state::EngineState;

/// Profundidad del buzón de directivas por sujeto.
const DIRECTIVE_MAILBOX_DEPTH: usize = 64;
/// Profundidad del canal de desenlaces de hijos.
const OUTCOME_CHANNEL_DEPTH: usize = 16;

/// Asa pública de un orquestador por sujeto.
#[derive(Clone)]
pub struct OrchestratorHandle {
    mailbox: mpsc::Sender<SubjectDirective>,
}

impl OrchestratorHandle {
    /// Encola una directiva; falla si el orquestador se detuvo.
    pub async fn submit(&self, directive: SubjectDirective) -> Result<(), CommandRejection> {
        self.mailbox
            .send(directive)
            .await
            .map_err(|_| CommandRejection::TemporarilyUnavailable)
    }

    pub fn is_halted(&self) -> bool {
        self.mailbox.is_closed()
    }
}

/// Corrida hija viva bajo este orquestador.
struct ActiveChild {
    run: ProtocolRun,
    signal_tx: mpsc::Sender<ProtocolSignal>,
    /// Asa retenida para que la tarea hija quede poseída por el padre.
    _task: JoinHandle<()>,
}

/// Desenlace terminal reportado por una corrida hija.
struct ChildOutcome {
    method: VerificationMethod,
    protocol_run_id: Uuid,
    outcome: ProtocolOutcome,
}

/// Máquina de estados externa de un sujeto, de vida indefinida.
pub struct SubjectOrchestrator {
    subject_id: Uuid,
    state: EngineState,
    snapshot: SubjectSnapshot,
    active_children: HashMap<VerificationMethod, ActiveChild>,
    /// Corridas terminales atascadas en compensación (consulta de operador).
    stuck_runs: Vec<ProtocolRun>,
    directives_rx: mpsc::Receiver<SubjectDirective>,
    outcome_tx: mpsc::Sender<ChildOutcome>,
    outcome_rx: mpsc::Receiver<ChildOutcome>,
    events_since_checkpoint: u64,
}

impl SubjectOrchestrator {
    /// Enciende el orquestador del sujeto y retorna su asa.
    pub fn spawn(subject_id: Uuid, state: EngineState) -> OrchestratorHandle {
        let (directives_tx, directives_rx) = mpsc::channel(DIRECTIVE_MAILBOX_DEPTH);
        let (outcome_tx, outcome_rx) = mpsc::channel(OUTCOME_CHANNEL_DEPTH);

        tokio::spawn(async move {
            let orchestrator = SubjectOrchestrator {
                subject_id,
                state,
                snapshot: SubjectSnapshot::genesis(subject_id),
                active_children: HashMap::new(),
                stuck_runs: Vec::new(),
                directives_rx,
                outcome_tx,
                outcome_rx,
                events_since_checkpoint: 0,
            };
            orchestrator.run().await;
        });

        OrchestratorHandle { mailbox: directives_tx }
    }

    /// Bucle de vida del orquestador: rehidratación y atención perpetua.
    #[instrument(skip(self), fields(subject = %self.subject_id))]
    async fn run(mut self) {
        if let Err(rehydration_fault) = self.rehydrate().await {
            error!(
                "💀 [ORCHESTRATOR_HALT]: Rehydration collapsed for [{}]: {}. Stream sealed.",
                self.subject_id, rehydration_fault
            );
            return;
        }

        loop {
            let next_expiry = self.earliest_expiry();
            let expiry_budget = next_expiry
                .map(|at| (at - Utc::now()).to_std().unwrap_or_default())
                .unwrap_or(std::time::Duration::from_secs(3600 * 24));

            tokio::select! {
                directive = self.directives_rx.recv() => match directive {
                    Some(directive) => self.handle_directive(directive).await,
                    // El gateway soltó el asa: el proceso se está apagando.
                    None => break,
                },
                outcome = self.outcome_rx.recv() => {
                    if let Some(child_outcome) = outcome {
                        if let Err(outcome_fault) = self.handle_child_outcome(child_outcome).await {
                            error!(
                                "💀 [ORCHESTRATOR_HALT]: Outcome absorption collapsed for [{}]: {}.",
                                self.subject_id, outcome_fault
                            );
                            break;
                        }
                    }
                },
                _ = tokio::time::sleep(expiry_budget), if next_expiry.is_some() => {
                    if let Err(expiry_fault) = self.handle_expiry_fire().await {
                        error!(
                            "💀 [ORCHESTRATOR_HALT]: Expiry sweep collapsed for [{}]: {}.",
                            self.subject_id, expiry_fault
                        );
                        break;
                    }
                },
            }
        }
    }

    // --- ESTRATO DE REHIDRATACIÓN (DURABLE REPLAY) ---

    /// Reconstruye la proyección desde el marcador y re-registra corridas.
    async fn rehydrate(&mut self) -> anyhow::Result<()> {
        let base = match self.state.checkpoints.fetch(self.subject_id).await? {
            Some(marker) => marker,
            None => SubjectSnapshot::genesis(self.subject_id),
        };

        let tail_events = self.state.journal.read_journal(self.subject_id, base.last_seq).await?;
        let replayed = tail_events.len();

        self.snapshot = veritas_domain_scoring::projection::fold_from(base, tail_events)
            .map_err(|fold_fault| anyhow::anyhow!(fold_fault.to_string()))?;

        // Re-registro de corridas vivas: 'method_started' sin evento terminal.
        let live_runs: Vec<ProtocolRun> = self.snapshot.active_protocols.values().cloned().collect();
        for run in live_runs {
            self.spawn_child(run);
        }

        if replayed > 0 || !self.active_children.is_empty() {
            info!(
                "🔄 [ORCHESTRATOR]: Subject [{}] rehydrated: {} events replayed, {} live runs re-armed, level {}.",
                self.subject_id,
                replayed,
                self.active_children.len(),
                self.snapshot.level.as_label()
            );
        }
        Ok(())
    }

    // --- ESTRATO DE DESPACHO DE DIRECTIVAS ---

    async fn handle_directive(&mut self, directive: SubjectDirective) {
        match directive {
            SubjectDirective::Command(command) => self.handle_command(command).await,
            SubjectDirective::Query(query) => self.handle_query(query),
        }
    }

    fn handle_query(&self, query: QueryEnvelope) {
        match query {
            QueryEnvelope::Score { reply } => {
                let _ = reply.send(self.snapshot.score);
            }
            QueryEnvelope::Level { reply } => {
                let _ = reply.send(self.snapshot.level);
            }
            QueryEnvelope::Completed { reply } => {
                let _ = reply.send(self.snapshot.completed_counts());
            }
            QueryEnvelope::NextLevel { reply } => {
                let _ = reply.send(engine::next_level(
                    self.snapshot.score,
                    self.snapshot.class,
                    &self.snapshot.completed_counts(),
                ));
            }
            QueryEnvelope::MethodStatus { method, reply } => {
                let view = veritas_domain_models::MethodStatusView {
                    completed_count: self.snapshot.completion_count(method),
                    active_state: self
                        .active_children
                        .get(&method)
                        .map(|child| child.run.state),
                    next_expiry: self.snapshot.next_expiry(method),
                };
                let _ = reply.send(view);
            }
            QueryEnvelope::StuckRuns { reply } => {
                let _ = reply.send(self.stuck_runs.clone());
            }
        }
    }

    async fn handle_command(&mut self, command: CommandEnvelope) {
        match command {
            CommandEnvelope::StartMethod { payload, reply } => {
                let verdict = self.execute_start_method(payload).await;
                let _ = reply.send(verdict);
            }
            CommandEnvelope::VerifierConfirm { payload, protocol_run_id, reply } => {
                let verdict = self.execute_verifier_confirm(payload, protocol_run_id).await;
                let _ = reply.send(verdict);
            }
            CommandEnvelope::CommunityAttest { payload, reply } => {
                let verdict = self.execute_community_attest(payload).await;
                let _ = reply.send(verdict);
            }
            CommandEnvelope::Revoke { payload, reply } => {
                let verdict = self.execute_revoke(payload).await;
                let _ = reply.send(verdict);
            }
            CommandEnvelope::CancelMethod { payload, reply } => {
                let verdict = self.execute_cancel_method(payload).await;
                let _ = reply.send(verdict);
            }
            CommandEnvelope::DeleteSubject { payload, reply } => {
                let verdict = self.execute_delete_subject(payload).await;
                let _ = reply.send(verdict);
            }
            CommandEnvelope::EnterCode { method, code, reply } => {
                let verdict = self.execute_enter_code(method, code).await;
                let _ = reply.send(verdict);
            }
            CommandEnvelope::ReviewDecision { method, approved, reason, reply } => {
                let verdict = self.execute_review_decision(method, approved, reason).await;
                let _ = reply.send(verdict);
            }
            CommandEnvelope::ForwardAttestation { method, attestor_id, statement, reply } => {
                let verdict = self.execute_forward_attestation(method, attestor_id, statement).await;
                let _ = reply.send(verdict);
            }
        }
    }

    /// Señal de atestación hacia una corrida de ingesta ya iniciada.
    async fn execute_forward_attestation(
        &mut self,
        method: VerificationMethod,
        attestor_id: Uuid,
        statement: String,
    ) -> Result<bool, CommandRejection> {
        // Veto de duplicados por método, simétrico al mando comunitario.
        if self
            .snapshot
            .attestors
            .get(&method)
            .map(|known| known.contains(&attestor_id))
            .unwrap_or(false)
        {
            return Err(CommandRejection::AlreadyAttested);
        }

        let child = self
            .active_children
            .get(&method)
            .ok_or(CommandRejection::NoActiveRun)?;

        let (ack_tx, ack_rx) = oneshot::channel();
        child
            .signal_tx
            .send(ProtocolSignal::Attestation { attestor_id, statement, reply: ack_tx })
            .await
            .map_err(|_| CommandRejection::NoActiveRun)?;

        match ack_rx.await.map_err(|_| CommandRejection::NoActiveRun)? {
            SignalAck::Accepted => Ok(true),
            SignalAck::Rejected(SignalRejection::AttestorDenied) => {
                Err(CommandRejection::AttestorDenied)
            }
            SignalAck::Rejected(_) => Err(CommandRejection::NoActiveRun),
        }
    }

    /// Señal 'code_entered' hacia el desafío activo del método.
    async fn execute_enter_code(
        &mut self,
        method: VerificationMethod,
        code: String,
    ) -> Result<bool, CommandRejection> {
        let child = self
            .active_children
            .get(&method)
            .ok_or(CommandRejection::NoActiveRun)?;

        let (ack_tx, ack_rx) = oneshot::channel();
        child
            .signal_tx
            .send(ProtocolSignal::CodeEntered { code, reply: ack_tx })
            .await
            .map_err(|_| CommandRejection::NoActiveRun)?;

        match ack_rx.await.map_err(|_| CommandRejection::NoActiveRun)? {
            SignalAck::Accepted => Ok(true),
            SignalAck::Rejected(SignalRejection::CodeMismatch { .. }) => Ok(false),
            SignalAck::Rejected(_) => Err(CommandRejection::NoActiveRun),
        }
    }

    /// Señal 'review_decision' hacia la corrida de revisión activa.
    async fn execute_review_decision(
        &mut self,
        method: VerificationMethod,
        approved: bool,
        reason: Option<String>,
    ) -> Result<(), CommandRejection> {
        let child = self
            .active_children
            .get(&method)
            .ok_or(CommandRejection::NoActiveRun)?;

        child
            .signal_tx
            .send(ProtocolSignal::ReviewDecision { approved, reason })
            .await
            .map_err(|_| CommandRejection::NoActiveRun)?;
        Ok(())
    }

    // --- ESTRATO DE MANDOS ---

    /// Mando 'StartMethod': precondiciones, sellado e ignición del hijo.
    async fn execute_start_method(
        &mut self,
        payload: veritas_domain_models::StartMethodPayload,
    ) -> Result<StartMethodReceipt, CommandRejection> {
        // Escudo de idempotencia: la repetición retorna el desenlace original.
        if let Some(sealed) = self.recall_command(payload.command_id).await? {
            let run_id = sealed
                .get("protocol_run_id")
                .and_then(|value| value.as_str())
                .and_then(|raw| Uuid::parse_str(raw).ok())
                .ok_or(CommandRejection::TemporarilyUnavailable)?;
            return Ok(StartMethodReceipt { protocol_run_id: run_id });
        }

        if self.snapshot.tombstoned {
            return Err(CommandRejection::SubjectTombstoned);
        }
        if !engine::applicable(payload.method, payload.subject_class) {
            return Err(CommandRejection::MethodNotApplicable);
        }
        if self.active_children.contains_key(&payload.method) {
            return Err(CommandRejection::AlreadyActive);
        }

        let now = Utc::now();
        let live_completions = self
            .snapshot
            .completions
            .get(&payload.method)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|completion| !engine::is_expired(completion, now))
                    .count() as u32
            })
            .unwrap_or(0);
        if live_completions >= engine::max_multiplier(payload.method) {
            return Err(CommandRejection::AlreadyMaxed);
        }

        let run = ProtocolRun {
            id: Uuid::new_v4(),
            method: payload.method,
            state: initial_state_for(payload.method),
            started_at: now,
            deadline: self.deadline_for(payload.method, now),
            params: payload.params.clone(),
        };

        let draft = EventDraft::bare(EventKind::MethodStarted, Some(payload.method))
            .with_run(run.id)
            .with_data(json!({
                "subject_class": payload.subject_class,
                "params": payload.params,
                "deadline": run.deadline.to_rfc3339(),
                "command_id": payload.command_id,
            }));
        self.append_and_refresh(draft).await?;

        self.spawn_child(run.clone());

        self.seal_command(payload.command_id, json!({ "protocol_run_id": run.id })).await;
        info!(
            "🚀 [ORCHESTRATOR]: Method [{}] ignited for [{}] (run {}).",
            payload.method.as_label(),
            self.subject_id,
            run.id
        );

        Ok(StartMethodReceipt { protocol_run_id: run.id })
    }

    /// Mando 'VerifierConfirm': reenvío de la señal hacia la corrida viva.
    async fn execute_verifier_confirm(
        &mut self,
        payload: veritas_domain_models::VerifierConfirmPayload,
        protocol_run_id: Uuid,
    ) -> Result<bool, CommandRejection> {
        if let Some(sealed) = self.recall_command(payload.command_id).await? {
            return Ok(sealed.get("accepted").and_then(|value| value.as_bool()).unwrap_or(true));
        }

        let child = self
            .active_children
            .values()
            .find(|child| child.run.id == protocol_run_id)
            .ok_or(CommandRejection::TokenUnknown)?;

        let (ack_tx, ack_rx) = oneshot::channel();
        child
            .signal_tx
            .send(ProtocolSignal::VerifierConfirmation {
                token_hex: payload.token.clone(),
                verifier_id: payload.verifier_id,
                evidence: payload.evidence.clone(),
                reply: ack_tx,
            })
            .await
            .map_err(|_| CommandRejection::TokenUnknown)?;

        let ack = ack_rx.await.map_err(|_| CommandRejection::TokenUnknown)?;
        let accepted = self.translate_ack(ack)?;

        self.seal_command(payload.command_id, json!({ "accepted": accepted })).await;
        Ok(accepted)
    }

    /// Mando 'CommunityAttest': autorización, ignición perezosa y reenvío.
    async fn execute_community_attest(
        &mut self,
        payload: veritas_domain_models::CommunityAttestPayload,
    ) -> Result<bool, CommandRejection> {
        if let Some(sealed) = self.recall_command(payload.command_id).await? {
            return Ok(sealed.get("accepted").and_then(|value| value.as_bool()).unwrap_or(true));
        }

        if self.snapshot.tombstoned {
            return Err(CommandRejection::SubjectTombstoned);
        }

        let method = VerificationMethod::CommunityAttestation;

        // Veto de duplicados: un atestador cuenta una sola vez por método.
        if self
            .snapshot
            .attestors
            .get(&method)
            .map(|known| known.contains(&payload.attestor_id))
            .unwrap_or(false)
        {
            return Err(CommandRejection::AlreadyAttested);
        }

        // Autorización mínima del atestador (nivel propio ≥ Minimal).
        let attestor_snapshot = self
            .state
            .journal
            .snapshot(payload.attestor_id)
            .await
            .map_err(|_| CommandRejection::TemporarilyUnavailable)?;
        if attestor_snapshot.level < VerificationLevel::Minimal {
            return Err(CommandRejection::AttestorDenied);
        }

        // Ignición perezosa del protocolo de atestación.
        if !self.active_children.contains_key(&method) {
            let now = Utc::now();
            let run = ProtocolRun {
                id: Uuid::new_v4(),
                method,
                state: initial_state_for(method),
                started_at: now,
                deadline: self.deadline_for(method, now),
                params: serde_json::Value::Null,
            };

            let draft = EventDraft::bare(EventKind::MethodStarted, Some(method))
                .with_run(run.id)
                .with_data(json!({
                    "subject_class": self.snapshot.class,
                    "deadline": run.deadline.to_rfc3339(),
                }));
            self.append_and_refresh(draft).await?;
            self.spawn_child(run);
        }

        let child = self
            .active_children
            .get(&method)
            .ok_or(CommandRejection::TemporarilyUnavailable)?;

        let (ack_tx, ack_rx) = oneshot::channel();
        child
            .signal_tx
            .send(ProtocolSignal::Attestation {
                attestor_id: payload.attestor_id,
                statement: payload.statement.clone(),
                reply: ack_tx,
            })
            .await
            .map_err(|_| CommandRejection::TemporarilyUnavailable)?;

        let ack = ack_rx.await.map_err(|_| CommandRejection::TemporarilyUnavailable)?;
        let accepted = self.translate_ack(ack)?;

        self.seal_command(payload.command_id, json!({ "accepted": accepted })).await;
        Ok(accepted)
    }

    /// Mando 'Revoke': sella la revocación y cancela la corrida activa.
    async fn execute_revoke(
        &mut self,
        payload: veritas_domain_models::RevokePayload,
    ) -> Result<VerificationLevel, CommandRejection> {
        if let Some(sealed) = self.recall_command(payload.command_id).await? {
            let level = sealed
                .get("new_level")
                .and_then(|value| serde_json::from_value(value.clone()).ok())
                .unwrap_or(self.snapshot.level);
            return Ok(level);
        }

        self.authorize_actor(payload.actor_id).await?;

        let has_live_completion = self.snapshot.completion_count(payload.method) > 0;
        let has_active_run = self.active_children.contains_key(&payload.method);
        if !has_live_completion && !has_active_run {
            return Err(CommandRejection::NothingToRevoke);
        }

        let old_level = self.snapshot.level;

        let draft = EventDraft::bare(EventKind::MethodRevoked, Some(payload.method))
            .with_actor(payload.actor_id)
            .with_data(json!({ "reason": payload.reason }));
        self.append_and_refresh(draft).await?;

        if has_active_run {
            self.cancel_child(payload.method).await;
        }

        self.reconcile_level(old_level).await?;

        let new_level = self.snapshot.level;
        self.seal_command(payload.command_id, json!({ "new_level": new_level })).await;

        warn!(
            "🗑️ [ORCHESTRATOR]: Method [{}] revoked for [{}]; level now {}.",
            payload.method.as_label(),
            self.subject_id,
            new_level.as_label()
        );
        Ok(new_level)
    }

    /// Mando 'CancelMethod': cancelación cooperativa de la corrida viva.
    async fn execute_cancel_method(
        &mut self,
        payload: veritas_domain_models::CancelMethodPayload,
    ) -> Result<(), CommandRejection> {
        if self.recall_command(payload.command_id).await?.is_some() {
            return Ok(());
        }

        if !self.active_children.contains_key(&payload.method) {
            return Err(CommandRejection::NothingToRevoke);
        }

        self.cancel_child(payload.method).await;
        self.seal_command(payload.command_id, json!({ "ok": true })).await;
        Ok(())
    }

    /// Mando 'DeleteSubject': lápida del stream y cancelación total.
    async fn execute_delete_subject(
        &mut self,
        payload: veritas_domain_models::DeleteSubjectPayload,
    ) -> Result<(), CommandRejection> {
        if self.recall_command(payload.command_id).await?.is_some() {
            return Ok(());
        }

        self.authorize_actor(payload.actor_id).await?;

        let draft = EventDraft::bare(EventKind::SubjectTombstoned, None)
            .with_actor(payload.actor_id)
            .with_data(json!({ "tombstoned_at": Utc::now().to_rfc3339() }));
        self.append_and_refresh(draft).await?;

        let methods: Vec<VerificationMethod> = self.active_children.keys().copied().collect();
        for method in methods {
            self.cancel_child(method).await;
        }

        self.seal_command(payload.command_id, json!({ "ok": true })).await;
        warn!("🪦 [ORCHESTRATOR]: Subject [{}] tombstoned.", self.subject_id);
        Ok(())
    }

    // --- ESTRATO DE DESENLACES DE HIJOS ---

    /// Algoritmo nuclear al recibir un desenlace terminal de un hijo.
    async fn handle_child_outcome(&mut self, child: ChildOutcome) -> anyhow::Result<()> {
        // Deregistro del hijo (si sigue registrado bajo ese método).
        let registered_run = self
            .active_children
            .get(&child.method)
            .map(|active| active.run.id == child.protocol_run_id)
            .unwrap_or(false);
        if registered_run {
            self.active_children.remove(&child.method);
        }

        let old_level = self.snapshot.level;

        match child.outcome {
            ProtocolOutcome::Completed { evidence_ref, data } => {
                let draft = EventDraft::bare(EventKind::MethodCompleted, Some(child.method))
                    .with_run(child.protocol_run_id)
                    .with_data(json!({ "evidence_ref": evidence_ref, "outcome": data }));
                self.append_and_refresh(draft)
                    .await
                    .map_err(|rejection| anyhow::anyhow!(rejection.to_string()))?;

                info!(
                    "🏅 [ORCHESTRATOR]: Method [{}] completed for [{}] (score {}).",
                    child.method.as_label(),
                    self.subject_id,
                    self.snapshot.score
                );
            }
            ProtocolOutcome::Failed(reason) => {
                let draft = EventDraft::bare(EventKind::MethodFailed, Some(child.method))
                    .with_run(child.protocol_run_id)
                    .with_data(json!({ "failure": &reason }));
                self.append_and_refresh(draft)
                    .await
                    .map_err(|rejection| anyhow::anyhow!(rejection.to_string()))?;

                if matches!(reason, FailureReason::CompensationIncomplete) {
                    // Única clase de estado atascado: visible para el operador.
                    self.stuck_runs.push(ProtocolRun {
                        id: child.protocol_run_id,
                        method: child.method,
                        state: ProtocolState::Failed,
                        started_at: self.snapshot.updated_at,
                        deadline: self.snapshot.updated_at,
                        params: json!({ "failure": "compensation_incomplete" }),
                    });
                    self.state.event_bus.emit_compensation_stuck(
                        self.subject_id,
                        child.method,
                        child.protocol_run_id,
                    );
                }

                debug!(
                    "🧯 [ORCHESTRATOR]: Method [{}] failed for [{}]: {}.",
                    child.method.as_label(),
                    self.subject_id,
                    reason.as_label()
                );
            }
            ProtocolOutcome::Cancelled => {
                let draft = EventDraft::bare(EventKind::MethodFailed, Some(child.method))
                    .with_run(child.protocol_run_id)
                    .with_data(json!({ "disposition": "cancelled" }));
                self.append_and_refresh(draft)
                    .await
                    .map_err(|rejection| anyhow::anyhow!(rejection.to_string()))?;
            }
        }

        self.reconcile_level(old_level)
            .await
            .map_err(|rejection| anyhow::anyhow!(rejection.to_string()))?;

        self.maybe_checkpoint().await
    }

    // --- ESTRATO DE DECAIMIENTO (TEMPORIZADORES DURABLES) ---

    /// Expiración más próxima entre todas las compleciones vigentes.
    fn earliest_expiry(&self) -> Option<DateTime<Utc>> {
        self.snapshot
            .completions
            .values()
            .flatten()
            .filter_map(|completion| completion.expires_at)
            .min()
            // Límite inclusivo: el disparo ocurre estrictamente después.
            .map(|at| at + Duration::milliseconds(1))
    }

    /// Disparo del temporizador: sella la expiración más temprana vencida.
    async fn handle_expiry_fire(&mut self) -> anyhow::Result<()> {
        let now = Utc::now();

        let ripe = self
            .snapshot
            .completions
            .iter()
            .flat_map(|(method, entries)| {
                entries
                    .iter()
                    .filter_map(move |completion| completion.expires_at.map(|at| (*method, at)))
            })
            .filter(|(_, at)| now > *at)
            .min_by_key(|(_, at)| *at);

        let Some((method, expired_at)) = ripe else {
            return Ok(());
        };

        let old_level = self.snapshot.level;

        let draft = EventDraft::bare(EventKind::MethodExpired, Some(method))
            .with_data(json!({ "expired_at": expired_at.to_rfc3339() }));
        self.append_and_refresh(draft)
            .await
            .map_err(|rejection| anyhow::anyhow!(rejection.to_string()))?;

        warn!(
            "⌛ [ORCHESTRATOR]: Method [{}] completion expired for [{}]; score now {}.",
            method.as_label(),
            self.subject_id,
            self.snapshot.score
        );

        self.reconcile_level(old_level)
            .await
            .map_err(|rejection| anyhow::anyhow!(rejection.to_string()))?;

        self.maybe_checkpoint().await
    }

    // --- ESTRATO DE SELLADO Y PROYECCIÓN ---

    /// Anexa un evento, refresca la proyección y difunde la señal.
    async fn append_and_refresh(&mut self, draft: EventDraft) -> Result<u64, CommandRejection> {
        let kind = draft.kind;

        let seq = self
            .state
            .journal
            .append(self.subject_id, &draft, None)
            .await
            .map_err(|append_fault| {
                error!("❌ [ORCHESTRATOR]: Journal append collapsed: {}.", append_fault);
                CommandRejection::TemporarilyUnavailable
            })?;

        self.snapshot = self
            .state
            .journal
            .snapshot(self.subject_id)
            .await
            .map_err(|_| CommandRejection::TemporarilyUnavailable)?;

        self.events_since_checkpoint += 1;
        self.state.event_bus.emit_journal_sealed(self.subject_id, seq, kind);
        Ok(seq)
    }

    /// Compara niveles tras un evento causante; sella 'level_changed' y
    /// despacha exactamente un intento de notificación tras el commit.
    async fn reconcile_level(&mut self, old_level: VerificationLevel) -> Result<(), CommandRejection> {
        // Los hijos pueden haber anexado eventos por su propio puerto.
        self.snapshot = self
            .state
            .journal
            .snapshot(self.subject_id)
            .await
            .map_err(|_| CommandRejection::TemporarilyUnavailable)?;

        let new_level = self.snapshot.level;
        if new_level == old_level {
            return Ok(());
        }

        let draft = EventDraft::bare(EventKind::LevelChanged, None).with_data(json!({
            "old_level": old_level,
            "new_level": new_level,
            "score": self.snapshot.score,
        }));
        self.append_and_refresh(draft).await?;

        self.state.event_bus.emit_level_shift(
            self.subject_id,
            old_level,
            new_level,
            self.snapshot.score,
        );
        self.state.notifier.dispatch_detached(
            self.subject_id,
            "level_changed",
            json!({
                "old_level": old_level,
                "new_level": new_level,
                "score": self.snapshot.score,
            }),
        );
        Ok(())
    }

    /// Marcador de compactación y auditoría de divergencia de proyección.
    async fn maybe_checkpoint(&mut self) -> anyhow::Result<()> {
        if self.events_since_checkpoint < self.state.settings.checkpoint_interval_events {
            return Ok(());
        }

        // Auditoría fatal: la proyección en RAM debe igualar el re-pliegue.
        let events = self.state.journal.read_journal(self.subject_id, 0).await?;
        let refolded = veritas_domain_scoring::projection::fold(self.subject_id, events)
            .map_err(|fold_fault| anyhow::anyhow!(fold_fault.to_string()))?;

        if refolded != self.snapshot {
            return Err(anyhow::anyhow!(
                "PROJECTION_DIVERGENCE: cached snapshot disagrees with full journal fold"
            ));
        }

        let seq = self
            .state
            .journal
            .append(
                self.subject_id,
                &EventDraft::bare(EventKind::SnapshotRebuilt, None)
                    .with_data(json!({ "upto_seq": self.snapshot.last_seq })),
                None,
            )
            .await?;
        self.snapshot = self.state.journal.snapshot(self.subject_id).await?;
        self.state.checkpoints.store(&self.snapshot).await?;
        self.state
            .event_bus
            .emit_journal_sealed(self.subject_id, seq, EventKind::SnapshotRebuilt);

        self.events_since_checkpoint = 0;
        Ok(())
    }

    // --- ESTRATO DE HIJOS ---

    /// Enciende la corrida hija y registra su asa de señales.
    fn spawn_child(&mut self, run: ProtocolRun) {
        let (signal_tx, signal_rx) = mpsc::channel(16);

        let context = ProtocolContext {
            subject_id: self.subject_id,
            protocol_run_id: run.id,
            method: run.method,
            deadline: run.deadline,
            collaborators: self.state.collaborators.clone(),
            tuning: self.state.settings.tuning,
        };

        let outcome_tx = self.outcome_tx.clone();
        let params = run.params.clone();
        let method = run.method;
        let run_id = run.id;

        let task = tokio::spawn(async move {
            let outcome = execute_method(context, params, signal_rx).await;
            let _ = outcome_tx
                .send(ChildOutcome { method, protocol_run_id: run_id, outcome })
                .await;
        });

        self.active_children.insert(run.method, ActiveChild { run, signal_tx, _task: task });
    }

    /// Cancelación cooperativa: el hijo compensa antes de salir.
    async fn cancel_child(&mut self, method: VerificationMethod) {
        if let Some(child) = self.active_children.get(&method) {
            if child.signal_tx.send(ProtocolSignal::Cancel).await.is_err() {
                // El hijo ya terminó; su desenlace llegará por el canal.
                debug!("📪 [ORCHESTRATOR]: Cancel raced a terminal outcome on [{}].", method.as_label());
            }
        }
    }

    // --- ESTRATO DE APOYO ---

    /// Autoriza al actor de un mando de gobernanza: el propio sujeto o
    /// un verificador vigente del directorio.
    async fn authorize_actor(&self, actor_id: Uuid) -> Result<(), CommandRejection> {
        if actor_id == self.subject_id {
            return Ok(());
        }

        let record = self
            .state
            .verifiers
            .fetch(actor_id)
            .await
            .map_err(|_| CommandRejection::TemporarilyUnavailable)?;

        match record {
            Some(verifier) if verifier.authorized && verifier.revoked_at.is_none() => Ok(()),
            _ => Err(CommandRejection::ActorNotAuthorized),
        }
    }

    /// Traduce la respuesta de señal del hijo al contrato del gateway.
    fn translate_ack(&self, ack: SignalAck) -> Result<bool, CommandRejection> {
        match ack {
            SignalAck::Accepted => Ok(true),
            SignalAck::Rejected(SignalRejection::TokenUnknown) => Err(CommandRejection::TokenUnknown),
            SignalAck::Rejected(SignalRejection::TokenExpired) => Err(CommandRejection::TokenExpired),
            SignalAck::Rejected(SignalRejection::VerifierDenied(reason)) => {
                Err(CommandRejection::VerifierDenied(reason))
            }
            SignalAck::Rejected(SignalRejection::AttestorDenied) => Err(CommandRejection::AttestorDenied),
            SignalAck::Rejected(SignalRejection::CodeMismatch { .. }) => Ok(false),
            SignalAck::Rejected(SignalRejection::NotAwaiting) => Err(CommandRejection::TokenUnknown),
        }
    }

    /// Recupera el desenlace de un mando ya sellado (escudo de idempotencia).
    async fn recall_command(
        &self,
        command_id: Uuid,
    ) -> Result<Option<serde_json::Value>, CommandRejection> {
        self.state
            .command_ledger
            .recall(self.subject_id, command_id)
            .await
            .map_err(|_| CommandRejection::TemporarilyUnavailable)
    }

    /// Sella el desenlace de un mando exitoso en el escudo de idempotencia.
    async fn seal_command(&self, command_id: Uuid, outcome: serde_json::Value) {
        if let Err(seal_fault) = self
            .state
            .command_ledger
            .seal(self.subject_id, command_id, &outcome)
            .await
        {
            // El mando ya quedó comprometido en el journal; el escudo es
            // best-effort y el fallo solo deja rastro.
            warn!("⚠️ [REPLAY_SHIELD]: Outcome seal failed: {}.", seal_fault);
        }
    }

    /// Deadline de una corrida según la familia del método.
    fn deadline_for(&self, method: VerificationMethod, now: DateTime<Utc>) -> DateTime<Utc> {
        match catalog::policy(method).family {
            ProtocolFamily::CodeChallenge => {
                now + Duration::minutes(self.state.settings.tuning.code_ttl_minutes)
            }
            ProtocolFamily::TwoPartySaga => {
                now + Duration::hours(self.state.settings.saga_deadline_hours)
            }
            ProtocolFamily::HumanReview => {
                now + Duration::days(self.state.settings.review_deadline_days)
            }
            ProtocolFamily::Attestation => {
                now + Duration::days(self.state.settings.attestation_deadline_days)
            }
            ProtocolFamily::PlatformRecord => now + Duration::minutes(5),
        }
    }
}

/// Estado público inicial de una corrida según su familia.
fn initial_state_for(method: VerificationMethod) -> ProtocolState {
    match catalog::policy(method).family {
        ProtocolFamily::HumanReview => ProtocolState::AwaitingReview,
        ProtocolFamily::PlatformRecord => ProtocolState::Pending,
        _ => ProtocolState::Waiting,
    }
}

