// [libs/infra/db-turso/src/repositories/mod.rs]
/*!
 * =================================================================
 * APARATO: REPOSITORY ACCESS MATRIX (V4.0 - TOPOLOGY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: ORQUESTACIÓN DE SUBSISTEMAS DE PERSISTENCIA
 *
 * # Mathematical Proof (Modular Encapsulation):
 * El barrel file actúa como una interfaz galvánica: los sub-módulos
 * permanecen aislados y solo las estructuras de autoridad
 * (Repositories) son expuestas al exterior, reduciendo el
 * acoplamiento sistémico.
 * =================================================================
 */

// --- ESTRATO 1: EL LEDGER (AUTORIDAD ÚNICA) ---

/// Journal append-only con concurrencia optimista y proyección cacheada.
pub mod journal;
/// Marcadores de checkpoint de la proyección (pista de rendimiento).
pub mod checkpoint;

// --- ESTRATO 2: GOBERNANZA Y SAGA ---

/// Directorio de verificadores, credenciales y contadores atómicos.
pub mod verifier;
/// Almacén de tokens QR con semántica CAS.
pub mod token;

// --- ESTRATO 3: ESCUDO DE IDEMPOTENCIA ---

/// Ledger de mandos ya ejecutados (replay idempotente).
pub mod command;

// --- RE-EXPORTACIONES SOBERANAS (NOMINAL ACCESS API) ---

pub use checkpoint::CheckpointRepository;
pub use command::CommandLedgerRepository;
pub use journal::JournalRepository;
pub use token::TokenRepository;
pub use verifier::VerifierRepository;

/// Formato temporal uniforme del Ledger (micros, ancho fijo): garantiza
/// orden lexicográfico correcto en comparaciones SQL.
pub(crate) fn seal_timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|parsed| parsed.with_timezone(&chrono::Utc))
}
