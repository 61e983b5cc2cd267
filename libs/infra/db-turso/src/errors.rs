// [libs/infra/db-turso/src/errors.rs]
/*!
 * =================================================================
 * APARATO: DATABASE ERROR CATALOG (V4.2 - SOBERANO)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE PERSISTENCIA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. RETRY TRIAGE: 'SequenceConflict' es reintenable con lectura fresca;
 *    'ConnectionError' es reintenable con retroceso; el resto es semántico.
 * 2. PANOPTICON COMPLIANCE: Formatea los mensajes con prefijos de estrato
 *    para su renderizado cromático en el Dashboard.
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Error de enlace físico o de red con el cluster de Turso.
    #[error("[L3_DB_NET_FAULT]: DATABASE_UPLINK_SEVERED -> {0}")]
    ConnectionError(String),

    /// Fallo en la configuración del entorno (variables vacías o malformadas).
    #[error("[L3_DB_CONFIG_FAULT]: STRATEGIC_ENV_VOID -> {0}")]
    ConfigurationError(String),

    /// Error de sintaxis o ejecución devuelto por el motor libSQL.
    #[error("[L3_DB_QUERY_FAULT]: SQL_QUERY_REJECTED -> {0}")]
    QueryError(#[from] libsql::Error),

    /// Fallo en la transformación de tipos entre SQLite y el Dominio Rust.
    #[error("[L3_DB_MAPPING_FAULT]: DATA_MAPPING_VIOLATION -> {0}")]
    MappingError(String),

    // --- ESTRATO DEL JOURNAL (CONCURRENCIA OPTIMISTA) ---

    /// El anexo perdió la carrera de secuencia; releer y reintentar.
    #[error("[L3_JOURNAL_FAULT]: SEQUENCE_CONFLICT -> expected tail {expected_last_seq}")]
    SequenceConflict { expected_last_seq: u64 },

    /// El pliegue del journal detectó corrupción estructural.
    #[error("[L3_JOURNAL_FAULT]: LEDGER_FOLD_VIOLATION -> {0}")]
    FoldViolation(String),

    // --- ESTRATO DE GOBERNANZA DE VERIFICADORES ---

    /// El verificador solicitado no existe en el directorio.
    #[error("[L3_GOVERNANCE_FAULT]: VERIFIER_NOT_FOUND")]
    VerifierNotFound,

    // --- ESTRATO DE TOKENS QR ---

    /// El token solicitado no existe en el almacén.
    #[error("[L3_TOKEN_FAULT]: TOKEN_NOT_FOUND")]
    TokenNotFound,
}

impl DbError {
    /// Decide si el fallo amerita reintento con retroceso.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DbError::ConnectionError(_) | DbError::QueryError(_) | DbError::SequenceConflict { .. }
        )
    }
}
