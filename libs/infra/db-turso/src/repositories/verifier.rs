// [libs/infra/db-turso/src/repositories/verifier.rs]
/*!
 * =================================================================
 * APARATO: VERIFIER REGISTRY REPOSITORY (V4.0 - GOVERNANCE SOBERANO)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: DIRECTORIO DE VERIFICADORES Y CONTADORES ATÓMICOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ATOMIC COUNTERS: Los contadores de confirmaciones se mueven con
 *    'UPDATE ... = x + 1' en ráfaga única; sin read-modify-write.
 * 2. SNAPSHOT BRIDGE: El puerto de directorio resuelve el snapshot del
 *    verificador plegando su propio journal, cerrando el circuito de
 *    la política de autorización.
 * =================================================================
 */

use std::collections::BTreeSet;

use chrono::Utc;
use libsql::params;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use veritas_domain_models::{CredentialKind, SubjectSnapshot, VerifierRecord};
use veritas_domain_protocols::{PortFault, VerifierDirectoryPort};

use crate::errors::DbError;
use crate::repositories::journal::JournalRepository;
use crate::repositories::{parse_timestamp, seal_timestamp};
use crate::TursoClient;

/// Repositorio de autoridad única del directorio de verificadores.
#[derive(Clone)]
pub struct VerifierRepository {
    database_client: TursoClient,
    /// Puente hacia el journal para hidratar snapshots de verificadores.
    journal: JournalRepository,
}

impl VerifierRepository {
    pub fn new(client: TursoClient, journal: JournalRepository) -> Self {
        Self { database_client: client, journal }
    }

    /// Registra (o re-registra) un verificador con sus credenciales.
    #[instrument(skip(self, credentials))]
    pub async fn register_verifier(
        &self,
        subject_id: Uuid,
        credentials: &BTreeSet<CredentialKind>,
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;

        let credentials_serialized = serde_json::to_string(credentials)
            .map_err(|fault| DbError::MappingError(format!("CREDENTIALS_FAULT: {}", fault)))?;

        connection
            .execute(
                "INSERT INTO verifier_records
                    (subject_id, credentials_json, authorized, revoked_at, revocation_reason, successful_confirmations)
                 VALUES (?1, ?2, 1, NULL, NULL, 0)
                 ON CONFLICT(subject_id) DO UPDATE SET
                    credentials_json = excluded.credentials_json,
                    authorized = 1,
                    revoked_at = NULL,
                    revocation_reason = NULL",
                params![subject_id.to_string(), credentials_serialized],
            )
            .await?;

        info!("🛡️ [VERIFIER_REGISTRY]: Verifier [{}] crystallized.", subject_id);
        Ok(())
    }

    /// Recupera el registro de un verificador, si existe.
    pub async fn fetch(&self, subject_id: Uuid) -> Result<Option<VerifierRecord>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT credentials_json, authorized, revoked_at, revocation_reason, successful_confirmations
                 FROM verifier_records WHERE subject_id = ?1",
                params![subject_id.to_string()],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        let credentials_raw: String = row.get(0)?;
        let authorized: i64 = row.get(1)?;
        let revoked_raw: Option<String> = row.get(2)?;
        let revocation_reason: Option<String> = row.get(3)?;
        let confirmations: i64 = row.get(4)?;

        let credentials: BTreeSet<CredentialKind> = serde_json::from_str(&credentials_raw)
            .map_err(|fault| DbError::MappingError(format!("CREDENTIALS_FAULT: {}", fault)))?;

        Ok(Some(VerifierRecord {
            subject_id,
            credentials,
            authorized: authorized != 0,
            revoked_at: revoked_raw.as_deref().and_then(parse_timestamp),
            revocation_reason,
            successful_confirmations: confirmations as u32,
        }))
    }

    /// Otorga una credencial adicional a un verificador vigente.
    #[instrument(skip(self))]
    pub async fn grant_credential(
        &self,
        subject_id: Uuid,
        credential: CredentialKind,
    ) -> Result<(), DbError> {
        let Some(mut record) = self.fetch(subject_id).await? else {
            return Err(DbError::VerifierNotFound);
        };

        record.credentials.insert(credential);
        let credentials_serialized = serde_json::to_string(&record.credentials)
            .map_err(|fault| DbError::MappingError(format!("CREDENTIALS_FAULT: {}", fault)))?;

        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "UPDATE verifier_records SET credentials_json = ?2 WHERE subject_id = ?1",
                params![subject_id.to_string(), credentials_serialized],
            )
            .await?;

        info!(
            "🎖️ [VERIFIER_REGISTRY]: Credential [{}] granted to [{}].",
            credential.as_label(),
            subject_id
        );
        Ok(())
    }

    /// Revoca la autoridad de un verificador (gobernanza).
    #[instrument(skip(self))]
    pub async fn revoke_verifier(&self, subject_id: Uuid, reason: &str) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;

        let affected = connection
            .execute(
                "UPDATE verifier_records
                 SET authorized = 0, revoked_at = ?2, revocation_reason = ?3
                 WHERE subject_id = ?1",
                params![subject_id.to_string(), seal_timestamp(Utc::now()), reason],
            )
            .await?;

        if affected == 0 {
            return Err(DbError::VerifierNotFound);
        }

        warn!("💀 [VERIFIER_REGISTRY]: Verifier [{}] revoked: {}.", subject_id, reason);
        Ok(())
    }

    /// Incremento atómico del contador de confirmaciones exitosas.
    pub async fn increment_confirmations(&self, subject_id: Uuid) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        let affected = connection
            .execute(
                "UPDATE verifier_records
                 SET successful_confirmations = successful_confirmations + 1
                 WHERE subject_id = ?1",
                params![subject_id.to_string()],
            )
            .await?;

        if affected == 0 {
            return Err(DbError::VerifierNotFound);
        }
        Ok(())
    }

    /// Decremento atómico saturado (compensación de la saga).
    pub async fn decrement_confirmations(&self, subject_id: Uuid) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        let affected = connection
            .execute(
                "UPDATE verifier_records
                 SET successful_confirmations = MAX(successful_confirmations - 1, 0)
                 WHERE subject_id = ?1",
                params![subject_id.to_string()],
            )
            .await?;

        if affected == 0 {
            return Err(DbError::VerifierNotFound);
        }
        Ok(())
    }
}

// --- PUERTO DEL DOMINIO: DIRECTORIO PARA LA SAGA Y ATESTACIONES ---

#[async_trait::async_trait]
impl VerifierDirectoryPort for VerifierRepository {
    async fn fetch_verifier(&self, verifier_id: Uuid) -> Result<Option<VerifierRecord>, PortFault> {
        self.fetch(verifier_id)
            .await
            .map_err(|db_fault| PortFault::Unavailable(db_fault.to_string()))
    }

    async fn fetch_snapshot(&self, subject_id: Uuid) -> Result<SubjectSnapshot, PortFault> {
        self.journal
            .snapshot(subject_id)
            .await
            .map_err(|db_fault| PortFault::Unavailable(db_fault.to_string()))
    }

    async fn increment_confirmations(&self, verifier_id: Uuid) -> Result<(), PortFault> {
        VerifierRepository::increment_confirmations(self, verifier_id)
            .await
            .map_err(|db_fault| match db_fault {
                DbError::VerifierNotFound => PortFault::Conflict("verifier_unknown".into()),
                other => PortFault::Unavailable(other.to_string()),
            })
    }

    async fn decrement_confirmations(&self, verifier_id: Uuid) -> Result<(), PortFault> {
        VerifierRepository::decrement_confirmations(self, verifier_id)
            .await
            .map_err(|db_fault| match db_fault {
                DbError::VerifierNotFound => PortFault::Conflict("verifier_unknown".into()),
                other => PortFault::Unavailable(other.to_string()),
            })
    }
}
