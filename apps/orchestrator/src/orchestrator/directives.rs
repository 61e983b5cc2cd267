// [apps/orchestrator/src/orchestrator/directives.rs]
/*!
 * =================================================================
 * APARATO: SUBJECT DIRECTIVE CONTRACT (V3.0 - MAILBOX PROTOCOL)
 * CLASIFICACIÓN: APPLICATION CORE (ESTRATO L1-APP)
 * RESPONSABILIDAD: SOBRES DE MANDO Y CONSULTA DEL BUZÓN POR SUJETO
 *
 * Mandos y consultas viajan por el mismo buzón serializado; los mandos
 * portan su canal de respuesta 'oneshot' y solo se reconocen tras el
 * commit del evento en el journal (read-your-write).
 * =================================================================
 */

use std::collections::BTreeMap;

use tokio::sync::oneshot;
use uuid::Uuid;
use veritas_domain_models::{
    CancelMethodPayload, CommandRejection, CommunityAttestPayload, DeleteSubjectPayload,
    MethodStatusView, NextLevelView, ProtocolRun, RevokePayload, StartMethodPayload,
    StartMethodReceipt, VerificationLevel, VerificationMethod, VerifierConfirmPayload,
};

/// Directiva entrante al orquestador de un sujeto.
pub enum SubjectDirective {
    Command(CommandEnvelope),
    Query(QueryEnvelope),
}

/// Sobres de mando (mutan estado; responden tras el commit).
pub enum CommandEnvelope {
    StartMethod {
        payload: StartMethodPayload,
        reply: oneshot::Sender<Result<StartMethodReceipt, CommandRejection>>,
    },
    /// Confirmación de verificador ya resuelta por el gateway hacia la
    /// corrida destino (el token decide el sujeto objetivo).
    VerifierConfirm {
        payload: VerifierConfirmPayload,
        protocol_run_id: Uuid,
        reply: oneshot::Sender<Result<bool, CommandRejection>>,
    },
    CommunityAttest {
        payload: CommunityAttestPayload,
        reply: oneshot::Sender<Result<bool, CommandRejection>>,
    },
    Revoke {
        payload: RevokePayload,
        reply: oneshot::Sender<Result<VerificationLevel, CommandRejection>>,
    },
    CancelMethod {
        payload: CancelMethodPayload,
        reply: oneshot::Sender<Result<(), CommandRejection>>,
    },
    DeleteSubject {
        payload: DeleteSubjectPayload,
        reply: oneshot::Sender<Result<(), CommandRejection>>,
    },
    /// Señal de código hacia el desafío activo del método.
    /// Responde true ante acierto, false ante código errado con intentos
    /// remanentes.
    EnterCode {
        method: VerificationMethod,
        code: String,
        reply: oneshot::Sender<Result<bool, CommandRejection>>,
    },
    /// Decisión del revisor humano hacia la corrida de revisión activa.
    ReviewDecision {
        method: VerificationMethod,
        approved: bool,
        reason: Option<String>,
        reply: oneshot::Sender<Result<(), CommandRejection>>,
    },
    /// Atestación de referencia hacia una corrida de ingesta ya iniciada
    /// (PersonalReference, BusinessReference, OrgReference, ...).
    ForwardAttestation {
        method: VerificationMethod,
        attestor_id: Uuid,
        statement: String,
        reply: oneshot::Sender<Result<bool, CommandRejection>>,
    },
}

/// Sobres de consulta (lecturas síncronas de la proyección vigente).
pub enum QueryEnvelope {
    Score { reply: oneshot::Sender<i64> },
    Level { reply: oneshot::Sender<VerificationLevel> },
    Completed { reply: oneshot::Sender<BTreeMap<VerificationMethod, u32>> },
    NextLevel { reply: oneshot::Sender<NextLevelView> },
    MethodStatus { method: VerificationMethod, reply: oneshot::Sender<MethodStatusView> },
    /// Corridas atascadas en compensación (atención de operador).
    StuckRuns { reply: oneshot::Sender<Vec<ProtocolRun>> },
}
