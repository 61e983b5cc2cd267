// [libs/infra/db-turso/src/lib.rs]
/*!
 * =================================================================
 * APARATO: TACTICAL PERSISTENCE ROOT (V3.1 - LEDGER AUTHORITY)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: EXPOSICIÓN DEL CLIENTE Y LOS REPOSITORIOS TÁCTICOS
 * =================================================================
 */

/// Cliente de enlace táctico hacia el motor libSQL.
pub mod client;

/// Catálogo semántico de fallos de persistencia.
pub mod errors;

/// Esquema soberano del Ledger de verificación.
pub mod schema;

/// Repositorios de autoridad única por subsistema.
pub mod repositories;

pub use client::TursoClient;
pub use errors::DbError;
pub use repositories::{
    CheckpointRepository, CommandLedgerRepository, JournalRepository, TokenRepository,
    VerifierRepository,
};
