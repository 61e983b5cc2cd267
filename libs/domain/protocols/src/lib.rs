// [libs/domain/protocols/src/lib.rs]
/*!
 * =================================================================
 * APARATO: CHILD PROTOCOL LIBRARY ROOT (V4.2 - STATE MACHINE STRATUM)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: ORQUESTACIÓN Y EXPOSICIÓN DE PROTOCOLOS HIJOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. STATIC DISPATCH: El método se resuelve a su familia de protocolo
 *    mediante la tabla estática del catálogo; sin jerarquías de tipos.
 * 2. SINGLE TERMINAL OUTCOME: Todo protocolo emite exactamente un
 *    desenlace terminal; 'Completed' jamás se emite dos veces.
 * 3. PORT ISOLATION: Todo efecto externo cruza un puerto async tipado,
 *    permitiendo dobles en memoria en el Proving Grounds.
 * =================================================================
 */

/// Contrato común: señales, desenlaces, contexto y afinación.
pub mod contract;

/// Puertos async hacia los colaboradores externos del motor.
pub mod ports;

/// Reintento acotado con retroceso exponencial.
pub mod backoff;

/// Desafío de código de 6 dígitos (Email, Phone).
pub mod code_challenge;

/// Saga presencial de dos verificadores con tokens QR y compensación.
pub mod two_party;

/// Espera de adjudicación humana sobre un documento.
pub mod human_review;

/// Ingesta de atestaciones y referencias de terceros autorizados.
pub mod attestation;

/// Registro directo de telemetría de plataforma.
pub mod platform_record;

/// Dobles en memoria de los puertos, para el Proving Grounds del workspace.
pub mod fakes;

pub use backoff::{retry_with_backoff, RetryPolicy};
pub use contract::{
    execute_method, Collaborators, ProtocolContext, ProtocolOutcome, ProtocolSignal,
    ProtocolTuning, SignalAck, SignalRejection,
};
pub use ports::{
    CodeDeliveryPort, JournalPort, NotificationPort, PortFault, ReviewQueuePort, ReviewTask,
    TokenBinding, TokenStorePort, VerifierDirectoryPort,
};
