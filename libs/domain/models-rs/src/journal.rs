// [libs/domain/models-rs/src/journal.rs]
/*!
 * =================================================================
 * APARATO: VERIFICATION JOURNAL MODELS (V5.0 - APPEND-ONLY LEDGER)
 * CLASIFICACIÓN: DOMAIN ENTITIES (L2)
 * RESPONSABILIDAD: CONTRATO DEL LEDGER DE EVENTOS Y COMPLECIONES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SINGLE SOURCE OF TRUTH: El journal por sujeto es el único estado
 *    autoritativo del motor; el snapshot es siempre un pliegue derivado.
 * 2. GAP-FREE SEQUENCING: 'seq' es monótono y sin huecos por sujeto;
 *    cualquier hueco es evidencia de corrupción del Ledger.
 * 3. IMMUTABILITY: Los eventos jamás se mutan; las compleciones solo
 *    admiten el sellado de revocación.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;
use uuid::Uuid;

use crate::method::VerificationMethod;

/// Clase de evento del journal de verificación. Enumeración cerrada.
#[typeshare]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    MethodStarted,
    MethodCompleted,
    MethodFailed,
    MethodRevoked,
    MethodExpired,
    LevelChanged,
    VerifierConfirmed,
    VerifierConfirmationRevoked,
    AttestationReceived,
    SnapshotRebuilt,
    SubjectTombstoned,
}

impl EventKind {
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::MethodStarted => "method_started",
            EventKind::MethodCompleted => "method_completed",
            EventKind::MethodFailed => "method_failed",
            EventKind::MethodRevoked => "method_revoked",
            EventKind::MethodExpired => "method_expired",
            EventKind::LevelChanged => "level_changed",
            EventKind::VerifierConfirmed => "verifier_confirmed",
            EventKind::VerifierConfirmationRevoked => "verifier_confirmation_revoked",
            EventKind::AttestationReceived => "attestation_received",
            EventKind::SnapshotRebuilt => "snapshot_rebuilt",
            EventKind::SubjectTombstoned => "subject_tombstoned",
        }
    }

    /// Inventario completo de clases de evento.
    pub const ALL: [EventKind; 11] = [
        EventKind::MethodStarted,
        EventKind::MethodCompleted,
        EventKind::MethodFailed,
        EventKind::MethodRevoked,
        EventKind::MethodExpired,
        EventKind::LevelChanged,
        EventKind::VerifierConfirmed,
        EventKind::VerifierConfirmationRevoked,
        EventKind::AttestationReceived,
        EventKind::SnapshotRebuilt,
        EventKind::SubjectTombstoned,
    ];

    /// Resuelve una clase de evento desde su etiqueta nominal.
    pub fn from_label(label: &str) -> Option<Self> {
        EventKind::ALL.into_iter().find(|kind| kind.as_label() == label)
    }
}

/// Elemento inmutable del journal por sujeto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationEvent {
    /// Secuencia monótona y sin huecos dentro del stream del sujeto.
    pub seq: u64,
    pub at: DateTime<Utc>,
    pub kind: EventKind,
    pub method: Option<VerificationMethod>,
    /// Sujeto actor (verificador, atestador, operador) cuando aplica.
    pub actor_subject_id: Option<Uuid>,
    pub protocol_run_id: Option<Uuid>,
    /// Carga estructurada específica del evento (evidencia, razones, saltos de nivel).
    pub data: serde_json::Value,
}

/// Borrador de evento previo a la asignación de 'seq' por el Ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDraft {
    pub kind: EventKind,
    pub method: Option<VerificationMethod>,
    pub actor_subject_id: Option<Uuid>,
    pub protocol_run_id: Option<Uuid>,
    pub data: serde_json::Value,
}

impl EventDraft {
    /// Borrador mínimo sin actor ni corrida de protocolo asociada.
    pub fn bare(kind: EventKind, method: Option<VerificationMethod>) -> Self {
        Self {
            kind,
            method,
            actor_subject_id: None,
            protocol_run_id: None,
            data: serde_json::Value::Null,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_actor(mut self, actor: Uuid) -> Self {
        self.actor_subject_id = Some(actor);
        self
    }

    pub fn with_run(mut self, run_id: Uuid) -> Self {
        self.protocol_run_id = Some(run_id);
        self
    }
}

/// Registro de una ejecución exitosa de un método para un sujeto.
///
/// Inmutable una vez escrito, salvo los campos de revocación.
#[typeshare]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCompletion {
    pub method: VerificationMethod,
    /// Índice de compleción dentro del multiplicador del método (base 1).
    pub sequence_index: u32,
    pub completed_at: DateTime<Utc>,
    /// Referencia opaca de evidencia (ids de verificadores, hash documental).
    pub evidence_ref: String,
    /// Presente si y solo si el método decae ('decay_days' > 0).
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revocation_reason: Option<String>,
}

/// Razón terminal de fallo de un protocolo hijo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailureReason {
    /// La ventana temporal del protocolo se agotó.
    Timeout,
    /// El desafío de código agotó sus intentos.
    Exhausted,
    /// El desafío de código expiró antes de un acierto.
    Expired,
    /// El revisor humano rechazó el documento.
    Rejected { detail: Option<String> },
    /// La validación de política denegó a un verificador de la saga.
    UnauthorizedVerifier { verifier_id: Uuid },
    /// La compensación de la saga no pudo completarse; requiere operador.
    CompensationIncomplete,
    /// Un colaborador externo agotó los reintentos del protocolo.
    CollaboratorUnavailable,
}

impl FailureReason {
    pub fn as_label(&self) -> &'static str {
        match self {
            FailureReason::Timeout => "timeout",
            FailureReason::Exhausted => "exhausted",
            FailureReason::Expired => "expired",
            FailureReason::Rejected { .. } => "rejected",
            FailureReason::UnauthorizedVerifier { .. } => "unauthorized_verifier",
            FailureReason::CompensationIncomplete => "compensation_incomplete",
            FailureReason::CollaboratorUnavailable => "collaborator_unavailable",
        }
    }
}
