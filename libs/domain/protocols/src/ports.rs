// [libs/domain/protocols/src/ports.rs]
/*!
 * =================================================================
 * APARATO: COLLABORATOR PORT MATRIX (V3.1 - ASYNC SEAMS)
 * CLASIFICACIÓN: DOMAIN CONTRACTS (ESTRATO L2)
 * RESPONSABILIDAD: INTERFACES NOMINALES HACIA COLABORADORES EXTERNOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. EXPLICIT HANDLES: Los colaboradores se inyectan en la construcción
 *    del orquestador; ningún protocolo toca estado global.
 * 2. ATOMIC TOKEN SEMANTICS: El almacén de tokens expone put-if-absent
 *    y consumo CAS; la unicidad de ranura se decide en el almacén.
 * =================================================================
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use veritas_domain_models::{EventDraft, SubjectSnapshot, VerificationMethod, VerifierRecord};

/// Fallo de un puerto de colaborador. Siempre potencialmente transitorio;
/// los protocolos deciden la política de reintento.
#[derive(Error, Debug, Clone)]
pub enum PortFault {
    /// El colaborador no respondió o rechazó temporalmente la operación.
    #[error("[L2_PORT_FAULT]: COLLABORATOR_UNAVAILABLE -> {0}")]
    Unavailable(String),

    /// Conflicto semántico (CAS perdido, duplicado); no reintenable.
    #[error("[L2_PORT_FAULT]: COLLABORATOR_CONFLICT -> {0}")]
    Conflict(String),
}

/// Vinculación de un token QR a su ranura de verificación.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBinding {
    pub subject_id: Uuid,
    pub protocol_run_id: Uuid,
    /// Ranura de verificador: 1 o 2.
    pub verifier_slot: u8,
    pub expires_at: DateTime<Utc>,
    pub invalidated: bool,
    /// Verificador que consumió el token, si alguno.
    pub consumed_by: Option<Uuid>,
}

/// Tarea de revisión documental encolada al colaborador externo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewTask {
    pub subject_id: Uuid,
    pub method: VerificationMethod,
    pub protocol_run_id: Uuid,
    /// Referencia opaca al blob documental (el almacenamiento es externo).
    pub document_ref: String,
    pub deadline: DateTime<Utc>,
}

/// Entrega de códigos de desafío fuera de banda (email / SMS).
#[async_trait]
pub trait CodeDeliveryPort: Send + Sync {
    async fn send_code(&self, target: &str, code: &str, ttl_minutes: i64) -> Result<(), PortFault>;
}

/// Cola de revisión humana de documentos.
#[async_trait]
pub trait ReviewQueuePort: Send + Sync {
    /// Encola la tarea y retorna el identificador de revisión externo.
    async fn enqueue_review(&self, task: ReviewTask) -> Result<String, PortFault>;
}

/// Almacén clave-valor de tokens QR con semántica atómica.
#[async_trait]
pub trait TokenStorePort: Send + Sync {
    /// Persiste el token solo si no existe. Retorna false ante colisión.
    async fn put_if_absent(&self, token_hex: &str, binding: TokenBinding) -> Result<bool, PortFault>;

    /// Resuelve la vinculación vigente de un token, si existe.
    async fn resolve(&self, token_hex: &str) -> Result<Option<TokenBinding>, PortFault>;

    /// Consume el token para un verificador (CAS). Retorna false si otro
    /// verificador lo consumió primero o el token fue invalidado.
    async fn consume(&self, token_hex: &str, verifier_id: Uuid) -> Result<bool, PortFault>;

    /// Marca el token como inválido (compensación de la saga).
    async fn invalidate(&self, token_hex: &str) -> Result<(), PortFault>;

    /// Tokens no invalidados de una corrida, ordenados por ranura.
    /// Sostiene la rehidratación de la saga y la consulta de códigos QR.
    async fn tokens_for_run(
        &self,
        protocol_run_id: Uuid,
    ) -> Result<Vec<(String, TokenBinding)>, PortFault>;
}

/// Directorio de verificadores: registros, snapshots y contadores.
#[async_trait]
pub trait VerifierDirectoryPort: Send + Sync {
    async fn fetch_verifier(&self, verifier_id: Uuid) -> Result<Option<VerifierRecord>, PortFault>;

    /// Snapshot de confianza vigente de un sujeto (proyección del journal).
    async fn fetch_snapshot(&self, subject_id: Uuid) -> Result<SubjectSnapshot, PortFault>;

    /// Incremento atómico del contador de confirmaciones exitosas.
    async fn increment_confirmations(&self, verifier_id: Uuid) -> Result<(), PortFault>;

    /// Decremento atómico (compensación de la saga).
    async fn decrement_confirmations(&self, verifier_id: Uuid) -> Result<(), PortFault>;
}

/// Ledger de eventos de verificación por sujeto.
#[async_trait]
pub trait JournalPort: Send + Sync {
    /// Anexa un evento al stream del sujeto y retorna el 'seq' sellado.
    async fn append(&self, subject_id: Uuid, draft: EventDraft) -> Result<u64, PortFault>;
}

/// Sumidero de notificaciones de la plataforma (at-least-once).
#[async_trait]
pub trait NotificationPort: Send + Sync {
    async fn deliver(
        &self,
        subject_id: Uuid,
        kind: &str,
        payload: serde_json::Value,
    ) -> Result<(), PortFault>;
}
