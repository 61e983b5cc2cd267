// [apps/orchestrator/src/gateway/mod.rs]
/*!
 * =================================================================
 * APARATO: COMMAND & QUERY GATEWAY (V5.0 - SUBJECT INDEX AUTHORITY)
 * CLASIFICACIÓN: APPLICATION CORE (ESTRATO L1-APP)
 * RESPONSABILIDAD: TRADUCCIÓN DE RPC A SEÑALES Y LECTURAS SÍNCRONAS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. RENDEZVOUS CREATION: Los primeros mandos concurrentes de un mismo
 *    sujeto confluyen en UNA instancia de orquestador; el índice vive
 *    bajo un cerrojo async y la creación es idempotente.
 * 2. TOKEN ROUTING: Una confirmación de verificador se enruta hacia el
 *    orquestador del sujeto OBJETIVO (el token decide), jamás al del
 *    verificador, con pre-chequeo de denegación obvia.
 * 3. ZERO BUSINESS LOGIC: El gateway traduce y enruta; toda decisión
 *    de negocio vive en el orquestador y sus protocolos.
 * =================================================================
 */

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::Utc;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use veritas_domain_models::{
    CancelMethodPayload, CommandRejection, CommunityAttestPayload, CredentialKind,
    DeleteSubjectPayload, DenialReason, MethodStatusView, NextLevelView, ProtocolRun,
    RevokePayload, StartMethodPayload, StartMethodReceipt, VerificationLevel, VerificationMethod,
    VerifierConfirmPayload,
};

use crate::orchestrator::{
    CommandEnvelope, OrchestratorHandle, QueryEnvelope, SubjectDirective, SubjectOrchestrator,
};
use crate::state::EngineState;

/// Gateway de mandos y consultas del motor de verificación.
pub struct VerificationGateway {
    state: EngineState,
    /// Índice sujeto → asa de orquestador (rendezvous de creación).
    orchestrator_index: Mutex<HashMap<Uuid, OrchestratorHandle>>,
}

impl VerificationGateway {
    pub fn new(state: EngineState) -> Self {
        Self { state, orchestrator_index: Mutex::new(HashMap::new()) }
    }

    /// Resuelve (o crea idempotentemente) el orquestador de un sujeto.
    async fn handle_for(&self, subject_id: Uuid) -> OrchestratorHandle {
        let mut index = self.orchestrator_index.lock().await;

        if let Some(existing) = index.get(&subject_id) {
            if !existing.is_halted() {
                return existing.clone();
            }
            // Orquestador detenido (halt fatal previo): re-ignición limpia.
            warn!("♻️ [GATEWAY]: Re-igniting halted orchestrator for [{}].", subject_id);
        }

        let fresh = SubjectOrchestrator::spawn(subject_id, self.state.clone());
        index.insert(subject_id, fresh.clone());
        debug!("🧭 [GATEWAY]: Orchestrator indexed for subject [{}].", subject_id);
        fresh
    }

    // --- ESTRATO DE MANDOS ---

    /// RPC 'StartMethod'.
    #[instrument(skip(self, payload), fields(subject = %payload.subject_id, method = %payload.method.as_label()))]
    pub async fn start_method(
        &self,
        payload: StartMethodPayload,
    ) -> Result<StartMethodReceipt, CommandRejection> {
        let handle = self.handle_for(payload.subject_id).await;
        let (reply_tx, reply_rx) = oneshot::channel();

        handle
            .submit(SubjectDirective::Command(CommandEnvelope::StartMethod {
                payload,
                reply: reply_tx,
            }))
            .await?;

        reply_rx.await.map_err(|_| CommandRejection::TemporarilyUnavailable)?
    }

    /// RPC 'VerifierConfirm': el token decide el sujeto objetivo.
    #[instrument(skip(self, payload), fields(verifier = %payload.verifier_id))]
    pub async fn verifier_confirm(
        &self,
        payload: VerifierConfirmPayload,
    ) -> Result<bool, CommandRejection> {
        // 1. RESOLUCIÓN DEL TOKEN → (sujeto objetivo, corrida)
        let binding = self
            .state
            .tokens
            .resolve(&payload.token)
            .await
            .map_err(|_| CommandRejection::TemporarilyUnavailable)?
            .ok_or(CommandRejection::TokenUnknown)?;

        if binding.invalidated {
            return Err(CommandRejection::TokenUnknown);
        }
        if Utc::now() > binding.expires_at {
            return Err(CommandRejection::TokenExpired);
        }

        // 2. PRE-CHEQUEO DE DENEGACIÓN OBVIA (registro del verificador)
        let verifier_record = self
            .state
            .verifiers
            .fetch(payload.verifier_id)
            .await
            .map_err(|_| CommandRejection::TemporarilyUnavailable)?;

        match verifier_record {
            None => return Err(CommandRejection::VerifierDenied(DenialReason::NotAVerifier)),
            Some(record) if record.revoked_at.is_some() || !record.authorized => {
                return Err(CommandRejection::VerifierDenied(DenialReason::Revoked));
            }
            Some(_) => {}
        }

        // 3. ENRUTAMIENTO HACIA EL ORQUESTADOR DEL SUJETO OBJETIVO
        let handle = self.handle_for(binding.subject_id).await;
        let (reply_tx, reply_rx) = oneshot::channel();

        handle
            .submit(SubjectDirective::Command(CommandEnvelope::VerifierConfirm {
                payload,
                protocol_run_id: binding.protocol_run_id,
                reply: reply_tx,
            }))
            .await?;

        reply_rx.await.map_err(|_| CommandRejection::TemporarilyUnavailable)?
    }

    /// RPC 'CommunityAttest'.
    #[instrument(skip(self, payload), fields(subject = %payload.subject_id, attestor = %payload.attestor_id))]
    pub async fn community_attest(
        &self,
        payload: CommunityAttestPayload,
    ) -> Result<bool, CommandRejection> {
        let handle = self.handle_for(payload.subject_id).await;
        let (reply_tx, reply_rx) = oneshot::channel();

        handle
            .submit(SubjectDirective::Command(CommandEnvelope::CommunityAttest {
                payload,
                reply: reply_tx,
            }))
            .await?;

        reply_rx.await.map_err(|_| CommandRejection::TemporarilyUnavailable)?
    }

    /// RPC 'Revoke'.
    #[instrument(skip(self, payload), fields(subject = %payload.subject_id, method = %payload.method.as_label()))]
    pub async fn revoke(&self, payload: RevokePayload) -> Result<VerificationLevel, CommandRejection> {
        let handle = self.handle_for(payload.subject_id).await;
        let (reply_tx, reply_rx) = oneshot::channel();

        handle
            .submit(SubjectDirective::Command(CommandEnvelope::Revoke { payload, reply: reply_tx }))
            .await?;

        reply_rx.await.map_err(|_| CommandRejection::TemporarilyUnavailable)?
    }

    /// RPC 'CancelMethod'.
    pub async fn cancel_method(&self, payload: CancelMethodPayload) -> Result<(), CommandRejection> {
        let handle = self.handle_for(payload.subject_id).await;
        let (reply_tx, reply_rx) = oneshot::channel();

        handle
            .submit(SubjectDirective::Command(CommandEnvelope::CancelMethod {
                payload,
                reply: reply_tx,
            }))
            .await?;

        reply_rx.await.map_err(|_| CommandRejection::TemporarilyUnavailable)?
    }

    /// Señal 'code_entered': ingreso del código de desafío del sujeto.
    /// Retorna true ante acierto, false ante código errado con intentos
    /// remanentes.
    #[instrument(skip(self, code), fields(subject = %subject_id, method = %method.as_label()))]
    pub async fn enter_code(
        &self,
        subject_id: Uuid,
        method: VerificationMethod,
        code: String,
    ) -> Result<bool, CommandRejection> {
        let handle = self.handle_for(subject_id).await;
        let (reply_tx, reply_rx) = oneshot::channel();

        handle
            .submit(SubjectDirective::Command(CommandEnvelope::EnterCode {
                method,
                code,
                reply: reply_tx,
            }))
            .await?;

        reply_rx.await.map_err(|_| CommandRejection::TemporarilyUnavailable)?
    }

    /// Señal 'review_decision': veredicto del revisor humano externo.
    #[instrument(skip(self), fields(subject = %subject_id, method = %method.as_label()))]
    pub async fn review_decision(
        &self,
        subject_id: Uuid,
        method: VerificationMethod,
        approved: bool,
        reason: Option<String>,
    ) -> Result<(), CommandRejection> {
        let handle = self.handle_for(subject_id).await;
        let (reply_tx, reply_rx) = oneshot::channel();

        handle
            .submit(SubjectDirective::Command(CommandEnvelope::ReviewDecision {
                method,
                approved,
                reason,
                reply: reply_tx,
            }))
            .await?;

        reply_rx.await.map_err(|_| CommandRejection::TemporarilyUnavailable)?
    }

    /// Señal de atestación hacia una corrida de ingesta ya iniciada
    /// (métodos de referencia fuera del mando comunitario).
    pub async fn submit_attestation(
        &self,
        subject_id: Uuid,
        method: VerificationMethod,
        attestor_id: Uuid,
        statement: String,
    ) -> Result<bool, CommandRejection> {
        let handle = self.handle_for(subject_id).await;
        let (reply_tx, reply_rx) = oneshot::channel();

        handle
            .submit(SubjectDirective::Command(CommandEnvelope::ForwardAttestation {
                method,
                attestor_id,
                statement,
                reply: reply_tx,
            }))
            .await?;

        reply_rx.await.map_err(|_| CommandRejection::TemporarilyUnavailable)?
    }

    /// RPC 'DeleteSubject' (lápida del stream).
    pub async fn delete_subject(&self, payload: DeleteSubjectPayload) -> Result<(), CommandRejection> {
        let handle = self.handle_for(payload.subject_id).await;
        let (reply_tx, reply_rx) = oneshot::channel();

        handle
            .submit(SubjectDirective::Command(CommandEnvelope::DeleteSubject {
                payload,
                reply: reply_tx,
            }))
            .await?;

        reply_rx.await.map_err(|_| CommandRejection::TemporarilyUnavailable)?
    }

    // --- ESTRATO DE CONSULTAS (LECTURAS SÍNCRONAS) ---

    pub async fn query_score(&self, subject_id: Uuid) -> Result<i64, CommandRejection> {
        self.query(subject_id, |reply| QueryEnvelope::Score { reply }).await
    }

    pub async fn query_level(&self, subject_id: Uuid) -> Result<VerificationLevel, CommandRejection> {
        self.query(subject_id, |reply| QueryEnvelope::Level { reply }).await
    }

    pub async fn query_completed(
        &self,
        subject_id: Uuid,
    ) -> Result<BTreeMap<VerificationMethod, u32>, CommandRejection> {
        self.query(subject_id, |reply| QueryEnvelope::Completed { reply }).await
    }

    pub async fn query_next_level(&self, subject_id: Uuid) -> Result<NextLevelView, CommandRejection> {
        self.query(subject_id, |reply| QueryEnvelope::NextLevel { reply }).await
    }

    pub async fn query_method_status(
        &self,
        subject_id: Uuid,
        method: VerificationMethod,
    ) -> Result<MethodStatusView, CommandRejection> {
        self.query(subject_id, |reply| QueryEnvelope::MethodStatus { method, reply }).await
    }

    /// Corridas atascadas en compensación (el único estado atascado).
    pub async fn query_stuck_runs(&self, subject_id: Uuid) -> Result<Vec<ProtocolRun>, CommandRejection> {
        self.query(subject_id, |reply| QueryEnvelope::StuckRuns { reply }).await
    }

    /// Tokens QR vigentes de una corrida (renderizado de códigos).
    pub async fn query_run_tokens(
        &self,
        protocol_run_id: Uuid,
    ) -> Result<Vec<String>, CommandRejection> {
        let bindings = self
            .state
            .tokens
            .tokens_for_run(protocol_run_id)
            .await
            .map_err(|_| CommandRejection::TemporarilyUnavailable)?;

        Ok(bindings.into_iter().map(|(token, _)| token).collect())
    }

    async fn query<T>(
        &self,
        subject_id: Uuid,
        build: impl FnOnce(oneshot::Sender<T>) -> QueryEnvelope,
    ) -> Result<T, CommandRejection> {
        let handle = self.handle_for(subject_id).await;
        let (reply_tx, reply_rx) = oneshot::channel();

        handle.submit(SubjectDirective::Query(build(reply_tx))).await?;
        reply_rx.await.map_err(|_| CommandRejection::TemporarilyUnavailable)
    }

    // --- ESTRATO DE GOBERNANZA DE VERIFICADORES (ADMIN) ---

    /// Alta administrativa de un verificador con sus credenciales.
    #[instrument(skip(self, credentials))]
    pub async fn register_verifier(
        &self,
        verifier_id: Uuid,
        credentials: BTreeSet<CredentialKind>,
    ) -> Result<(), CommandRejection> {
        self.state
            .verifiers
            .register_verifier(verifier_id, &credentials)
            .await
            .map_err(|_| CommandRejection::TemporarilyUnavailable)?;

        info!("🛡️ [GATEWAY]: Verifier [{}] registered with {} credentials.", verifier_id, credentials.len());
        Ok(())
    }

    /// Otorgamiento administrativo de una credencial adicional.
    pub async fn grant_credential(
        &self,
        verifier_id: Uuid,
        credential: CredentialKind,
    ) -> Result<(), CommandRejection> {
        self.state
            .verifiers
            .grant_credential(verifier_id, credential)
            .await
            .map_err(|db_fault| match db_fault {
                veritas_infra_db::DbError::VerifierNotFound => {
                    CommandRejection::VerifierDenied(DenialReason::NotAVerifier)
                }
                _ => CommandRejection::TemporarilyUnavailable,
            })
    }

    /// Revocación administrativa de la autoridad de un verificador.
    pub async fn revoke_verifier(
        &self,
        verifier_id: Uuid,
        reason: &str,
    ) -> Result<(), CommandRejection> {
        self.state
            .verifiers
            .revoke_verifier(verifier_id, reason)
            .await
            .map_err(|db_fault| match db_fault {
                veritas_infra_db::DbError::VerifierNotFound => {
                    CommandRejection::VerifierDenied(DenialReason::NotAVerifier)
                }
                _ => CommandRejection::TemporarilyUnavailable,
            })
    }
}
