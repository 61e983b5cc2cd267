// [libs/infra/db-turso/src/schema.rs]
/*!
 * =================================================================
 * APARATO: VERIFICATION LEDGER SCHEMA (V4.0 - APPEND-ONLY STRATA)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: ESQUEMA SOBERANO DEL MOTOR DE VERIFICACIÓN
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. APPEND-ONLY JOURNAL: La clave primaria (subject_id, seq) convierte
 *    al motor SQL en el árbitro físico de la concurrencia optimista:
 *    dos anexos con el mismo 'seq' colisionan en el índice primario.
 * 2. NO TRUNCATION: Ninguna tabla del journal admite UPDATE ni DELETE
 *    desde el motor; los marcadores de checkpoint son solo rendimiento.
 * 3. IDEMPOTENT BOOTSTRAP: 'IF NOT EXISTS' en todo el esquema.
 * =================================================================
 */

use libsql::Connection;
use tracing::{info, instrument};

/// Sentencias del esquema, en orden de dependencia.
const SCHEMA_STATEMENTS: [&str; 7] = [
    // Journal de eventos de verificación, el único estado autoritativo.
    "CREATE TABLE IF NOT EXISTS verification_journal (
        subject_id        TEXT    NOT NULL,
        seq               INTEGER NOT NULL,
        at                TEXT    NOT NULL,
        kind              TEXT    NOT NULL,
        method            TEXT,
        actor_subject_id  TEXT,
        protocol_run_id   TEXT,
        data              TEXT    NOT NULL DEFAULT 'null',
        PRIMARY KEY (subject_id, seq)
    )",
    // Marcador de checkpoint: pista de rendimiento, jamás autoridad.
    "CREATE TABLE IF NOT EXISTS snapshot_checkpoints (
        subject_id     TEXT    NOT NULL PRIMARY KEY,
        upto_seq       INTEGER NOT NULL,
        snapshot_json  TEXT    NOT NULL,
        created_at     TEXT    NOT NULL
    )",
    // Directorio de verificadores y sus credenciales.
    "CREATE TABLE IF NOT EXISTS verifier_records (
        subject_id                TEXT    NOT NULL PRIMARY KEY,
        credentials_json          TEXT    NOT NULL DEFAULT '[]',
        authorized                INTEGER NOT NULL DEFAULT 1,
        revoked_at                TEXT,
        revocation_reason         TEXT,
        successful_confirmations  INTEGER NOT NULL DEFAULT 0
    )",
    // Almacén de tokens QR de la saga presencial.
    "CREATE TABLE IF NOT EXISTS qr_tokens (
        token_hex        TEXT    NOT NULL PRIMARY KEY,
        subject_id       TEXT    NOT NULL,
        protocol_run_id  TEXT    NOT NULL,
        verifier_slot    INTEGER NOT NULL,
        expires_at       TEXT    NOT NULL,
        invalidated      INTEGER NOT NULL DEFAULT 0,
        consumed_by      TEXT
    )",
    // Ledger de idempotencia de mandos (Replay Shield).
    "CREATE TABLE IF NOT EXISTS command_ledger (
        subject_id    TEXT NOT NULL,
        command_id    TEXT NOT NULL,
        outcome_json  TEXT NOT NULL,
        sealed_at     TEXT NOT NULL,
        PRIMARY KEY (subject_id, command_id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_journal_kind
        ON verification_journal (subject_id, kind)",
    "CREATE INDEX IF NOT EXISTS idx_tokens_run
        ON qr_tokens (protocol_run_id)",
];

/// Aplica el esquema completo del motor sobre la conexión dada.
#[instrument(skip(connection))]
pub async fn apply_verification_schema(connection: &Connection) -> Result<(), libsql::Error> {
    for statement in SCHEMA_STATEMENTS {
        connection.execute(statement, ()).await?;
    }

    info!("🏛️ [SCHEMA]: Verification ledger strata levelized ({} apparatus).", SCHEMA_STATEMENTS.len());
    Ok(())
}
