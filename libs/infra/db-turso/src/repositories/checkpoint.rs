// [libs/infra/db-turso/src/repositories/checkpoint.rs]
/*!
 * =================================================================
 * APARATO: SNAPSHOT CHECKPOINT REPOSITORY (V2.0 - PERFORMANCE MARKER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: MARCADORES DE COMPACTACIÓN DE LA PROYECCIÓN
 *
 * El journal jamás se trunca: el marcador solo acota la relectura del
 * stream durante la rehidratación del orquestador.
 * =================================================================
 */

use chrono::Utc;
use libsql::params;
use tracing::{info, instrument};
use uuid::Uuid;
use veritas_domain_models::SubjectSnapshot;

use crate::errors::DbError;
use crate::repositories::seal_timestamp;
use crate::TursoClient;

/// Repositorio de marcadores de checkpoint de la proyección.
#[derive(Clone)]
pub struct CheckpointRepository {
    database_client: TursoClient,
}

impl CheckpointRepository {
    pub fn new(client: TursoClient) -> Self {
        Self { database_client: client }
    }

    /// Sella (o reemplaza) el marcador de un sujeto con su proyección.
    #[instrument(skip(self, snapshot), fields(subject = %snapshot.subject_id, upto = snapshot.last_seq))]
    pub async fn store(&self, snapshot: &SubjectSnapshot) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;

        let snapshot_serialized = serde_json::to_string(snapshot)
            .map_err(|fault| DbError::MappingError(format!("SNAPSHOT_FAULT: {}", fault)))?;

        connection
            .execute(
                "INSERT OR REPLACE INTO snapshot_checkpoints
                    (subject_id, upto_seq, snapshot_json, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    snapshot.subject_id.to_string(),
                    snapshot.last_seq as i64,
                    snapshot_serialized,
                    seal_timestamp(Utc::now())
                ],
            )
            .await?;

        info!("🏷️ [CHECKPOINT]: Projection marker sealed at seq {}.", snapshot.last_seq);
        Ok(())
    }

    /// Recupera el marcador vigente de un sujeto, si existe.
    pub async fn fetch(&self, subject_id: Uuid) -> Result<Option<SubjectSnapshot>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT snapshot_json FROM snapshot_checkpoints WHERE subject_id = ?1",
                params![subject_id.to_string()],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        let snapshot_raw: String = row.get(0)?;
        let snapshot = serde_json::from_str(&snapshot_raw)
            .map_err(|fault| DbError::MappingError(format!("SNAPSHOT_FAULT: {}", fault)))?;

        Ok(Some(snapshot))
    }
}
