// [libs/infra/db-turso/src/repositories/command.rs]
/*!
 * =================================================================
 * APARATO: COMMAND LEDGER REPOSITORY (V2.1 - REPLAY SHIELD)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: IDEMPOTENCIA DE MANDOS POR 'command_id'
 *
 * # Mathematical Proof (Idempotent Replay):
 * La clave primaria (subject_id, command_id) garantiza que un mando se
 * selle exactamente una vez; la repetición recupera el desenlace
 * original sin re-ejecutar efectos (Ley P7).
 * =================================================================
 */

use chrono::Utc;
use libsql::params;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::DbError;
use crate::repositories::seal_timestamp;
use crate::TursoClient;

/// Repositorio del escudo de idempotencia de mandos.
#[derive(Clone)]
pub struct CommandLedgerRepository {
    database_client: TursoClient,
}

impl CommandLedgerRepository {
    pub fn new(client: TursoClient) -> Self {
        Self { database_client: client }
    }

    /// Recupera el desenlace sellado de un mando ya ejecutado.
    pub async fn recall(
        &self,
        subject_id: Uuid,
        command_id: Uuid,
    ) -> Result<Option<serde_json::Value>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT outcome_json FROM command_ledger
                 WHERE subject_id = ?1 AND command_id = ?2",
                params![subject_id.to_string(), command_id.to_string()],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        let outcome_raw: String = row.get(0)?;
        let outcome = serde_json::from_str(&outcome_raw)
            .map_err(|fault| DbError::MappingError(format!("OUTCOME_FAULT: {}", fault)))?;

        debug!("🔁 [REPLAY_SHIELD]: Command [{}] recalled from the ledger.", command_id);
        Ok(Some(outcome))
    }

    /// Sella el desenlace de un mando. Retorna false si ya estaba sellado.
    #[instrument(skip(self, outcome))]
    pub async fn seal(
        &self,
        subject_id: Uuid,
        command_id: Uuid,
        outcome: &serde_json::Value,
    ) -> Result<bool, DbError> {
        let connection = self.database_client.get_connection()?;

        let outcome_serialized = serde_json::to_string(outcome)
            .map_err(|fault| DbError::MappingError(format!("OUTCOME_FAULT: {}", fault)))?;

        let sealed = connection
            .execute(
                "INSERT OR IGNORE INTO command_ledger
                    (subject_id, command_id, outcome_json, sealed_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    subject_id.to_string(),
                    command_id.to_string(),
                    outcome_serialized,
                    seal_timestamp(Utc::now())
                ],
            )
            .await?;

        Ok(sealed == 1)
    }
}
