// [libs/domain/models-rs/src/command.rs]
/*!
 * =================================================================
 * APARATO: COMMAND & QUERY CONTRACT (V6.0 - GATEWAY DTO)
 * CLASIFICACIÓN: DOMAIN ENTITIES (L2)
 * RESPONSABILIDAD: PAYLOADS DE MANDO, RECIBOS Y TAXONOMÍA DE RECHAZOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. IDEMPOTENT BY CONTRACT: Todo mando porta un 'command_id' elegido por
 *    el llamador; la repetición del mismo id retorna el desenlace original
 *    sin duplicar eventos en el Ledger.
 * 2. SEMANTIC REJECTIONS: Los rechazos de precondición son síncronos,
 *    tipados y jamás escriben en el journal.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use typeshare::typeshare;
use uuid::Uuid;

use crate::method::{VerificationLevel, VerificationMethod};
use crate::snapshot::ProtocolState;
use crate::subject::SubjectClass;

// --- ESTRATO DE PAYLOADS DE MANDO ---

/// Mando: iniciar un método de verificación para un sujeto.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartMethodPayload {
    pub subject_id: Uuid,
    pub subject_class: SubjectClass,
    pub method: VerificationMethod,
    /// Parámetros específicos del método (destino del código, blob documental).
    pub params: serde_json::Value,
    pub command_id: Uuid,
}

/// Mando: confirmación de un verificador portando su token de ranura QR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfirmPayload {
    /// Token opaco de 256 bits en codificación hexadecimal.
    pub token: String,
    pub verifier_id: Uuid,
    pub evidence: serde_json::Value,
    pub command_id: Uuid,
}

/// Mando: atestación comunitaria de un tercero sobre el sujeto.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityAttestPayload {
    pub subject_id: Uuid,
    pub attestor_id: Uuid,
    pub statement: String,
    pub command_id: Uuid,
}

/// Mando: revocar la compleción vigente más reciente de un método.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokePayload {
    pub subject_id: Uuid,
    pub method: VerificationMethod,
    pub reason: String,
    pub actor_id: Uuid,
    pub command_id: Uuid,
}

/// Mando: cancelar la corrida activa de un método.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelMethodPayload {
    pub subject_id: Uuid,
    pub method: VerificationMethod,
    pub command_id: Uuid,
}

/// Mando: sellar el stream de un sujeto eliminado de la plataforma.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteSubjectPayload {
    pub subject_id: Uuid,
    pub actor_id: Uuid,
    pub command_id: Uuid,
}

// --- ESTRATO DE RECIBOS Y VISTAS ---

/// Recibo de 'StartMethod': corrida de protocolo recién encendida (o la
/// original, ante una repetición idempotente del mismo 'command_id').
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StartMethodReceipt {
    pub protocol_run_id: Uuid,
}

/// Vista de la consulta 'MethodStatus'.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodStatusView {
    pub completed_count: u32,
    pub active_state: Option<ProtocolState>,
    pub next_expiry: Option<DateTime<Utc>>,
}

/// Ruta sugerida hacia el próximo nivel: un subconjunto de métodos cuyo
/// puntaje agregado alcanza los puntos faltantes.
#[typeshare]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedPath {
    pub methods: Vec<VerificationMethod>,
    pub total_points: i64,
}

/// Vista de la consulta 'NextLevel'.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextLevelView {
    pub target_level: VerificationLevel,
    pub points_needed: i64,
    pub suggested_paths: Vec<SuggestedPath>,
}

// --- ESTRATO DE TAXONOMÍA DE RECHAZOS ---

/// Razón de denegación de la política de autorización de verificadores.
#[typeshare]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    NotAVerifier,
    BelowMinimumLevel,
    Revoked,
    CredentialExpired,
    MethodNotSupported,
}

impl DenialReason {
    pub fn as_label(&self) -> &'static str {
        match self {
            DenialReason::NotAVerifier => "not_a_verifier",
            DenialReason::BelowMinimumLevel => "below_minimum_level",
            DenialReason::Revoked => "revoked",
            DenialReason::CredentialExpired => "credential_expired",
            DenialReason::MethodNotSupported => "method_not_supported",
        }
    }
}

/// Rechazo síncrono de un mando. Ningún rechazo escribe en el journal.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommandRejection {
    #[error("[L2_COMMAND_FAULT]: METHOD_NOT_APPLICABLE")]
    MethodNotApplicable,

    #[error("[L2_COMMAND_FAULT]: ALREADY_ACTIVE")]
    AlreadyActive,

    #[error("[L2_COMMAND_FAULT]: ALREADY_MAXED")]
    AlreadyMaxed,

    #[error("[L2_COMMAND_FAULT]: UNAUTHORIZED")]
    Unauthorized,

    #[error("[L2_COMMAND_FAULT]: TOKEN_UNKNOWN")]
    TokenUnknown,

    #[error("[L2_COMMAND_FAULT]: TOKEN_EXPIRED")]
    TokenExpired,

    #[error("[L2_COMMAND_FAULT]: VERIFIER_DENIED -> {0:?}")]
    VerifierDenied(DenialReason),

    #[error("[L2_COMMAND_FAULT]: ATTESTOR_DENIED")]
    AttestorDenied,

    #[error("[L2_COMMAND_FAULT]: ALREADY_ATTESTED")]
    AlreadyAttested,

    #[error("[L2_COMMAND_FAULT]: NOTHING_TO_REVOKE")]
    NothingToRevoke,

    /// El método no porta una corrida activa que reciba la señal.
    #[error("[L2_COMMAND_FAULT]: NO_ACTIVE_RUN")]
    NoActiveRun,

    #[error("[L2_COMMAND_FAULT]: ACTOR_NOT_AUTHORIZED")]
    ActorNotAuthorized,

    #[error("[L2_COMMAND_FAULT]: SUBJECT_TOMBSTONED")]
    SubjectTombstoned,

    /// Reintentos de infraestructura agotados; el llamador debe reintentar.
    #[error("[L2_COMMAND_FAULT]: TEMPORARILY_UNAVAILABLE")]
    TemporarilyUnavailable,
}
