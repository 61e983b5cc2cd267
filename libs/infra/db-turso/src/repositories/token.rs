// [libs/infra/db-turso/src/repositories/token.rs]
/*!
 * =================================================================
 * APARATO: QR TOKEN REPOSITORY (V3.2 - ATOMIC CAS STRATA)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: ALMACÉN ATÓMICO DE TOKENS DE LA SAGA PRESENCIAL
 *
 * # Mathematical Proof (Row-Level CAS):
 * El consumo encapsula la condición dentro del WHERE del UPDATE: el
 * motor SQL actúa como semáforo de exclusión mutua a nivel de fila,
 * asegurando que 1 Token <-> 1 Verificador de forma unívoca.
 * =================================================================
 */

use chrono::Utc;
use libsql::params;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use veritas_domain_protocols::{PortFault, TokenBinding, TokenStorePort};

use crate::errors::DbError;
use crate::repositories::{parse_timestamp, seal_timestamp};
use crate::TursoClient;

/// Repositorio de autoridad única del almacén de tokens QR.
#[derive(Clone)]
pub struct TokenRepository {
    database_client: TursoClient,
}

impl TokenRepository {
    pub fn new(client: TursoClient) -> Self {
        Self { database_client: client }
    }

    /// Persiste el token solo si no existe (put-if-absent físico).
    #[instrument(skip(self, binding))]
    pub async fn put_if_absent(
        &self,
        token_hex: &str,
        binding: &TokenBinding,
    ) -> Result<bool, DbError> {
        let connection = self.database_client.get_connection()?;

        let inserted = connection
            .execute(
                "INSERT OR IGNORE INTO qr_tokens
                    (token_hex, subject_id, protocol_run_id, verifier_slot, expires_at, invalidated, consumed_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, NULL)",
                params![
                    token_hex,
                    binding.subject_id.to_string(),
                    binding.protocol_run_id.to_string(),
                    binding.verifier_slot as i64,
                    seal_timestamp(binding.expires_at)
                ],
            )
            .await?;

        Ok(inserted == 1)
    }

    /// Resuelve la vinculación vigente de un token.
    pub async fn resolve(&self, token_hex: &str) -> Result<Option<TokenBinding>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT subject_id, protocol_run_id, verifier_slot, expires_at, invalidated, consumed_by
                 FROM qr_tokens WHERE token_hex = ?1",
                params![token_hex],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        let subject_raw: String = row.get(0)?;
        let run_raw: String = row.get(1)?;
        let slot: i64 = row.get(2)?;
        let expires_raw: String = row.get(3)?;
        let invalidated: i64 = row.get(4)?;
        let consumed_raw: Option<String> = row.get(5)?;

        Ok(Some(TokenBinding {
            subject_id: Uuid::parse_str(&subject_raw)
                .map_err(|fault| DbError::MappingError(format!("TOKEN_SUBJECT_FAULT: {}", fault)))?,
            protocol_run_id: Uuid::parse_str(&run_raw)
                .map_err(|fault| DbError::MappingError(format!("TOKEN_RUN_FAULT: {}", fault)))?,
            verifier_slot: slot as u8,
            expires_at: parse_timestamp(&expires_raw)
                .ok_or_else(|| DbError::MappingError(format!("TOKEN_EXPIRY_FAULT: {}", expires_raw)))?,
            invalidated: invalidated != 0,
            consumed_by: consumed_raw
                .map(|raw| {
                    Uuid::parse_str(&raw).map_err(|fault| {
                        DbError::MappingError(format!("TOKEN_CONSUMER_FAULT: {}", fault))
                    })
                })
                .transpose()?,
        }))
    }

    /**
     * Consumo CAS del token por un verificador.
     *
     * # Logic:
     * El UPDATE condicionado gana solo si el token sigue libre y vigente;
     * un reintento del mismo verificador resuelve idempotente.
     */
    #[instrument(skip(self))]
    pub async fn consume(&self, token_hex: &str, verifier_id: Uuid) -> Result<bool, DbError> {
        let connection = self.database_client.get_connection()?;

        let claimed = connection
            .execute(
                "UPDATE qr_tokens SET consumed_by = ?2
                 WHERE token_hex = ?1 AND invalidated = 0 AND consumed_by IS NULL",
                params![token_hex, verifier_id.to_string()],
            )
            .await?;

        if claimed == 1 {
            debug!("🎫 [TOKEN_CAS]: Slot claimed by verifier [{}].", verifier_id);
            return Ok(true);
        }

        // Carrera perdida o reintento: idempotente solo para el mismo consumidor.
        match self.resolve(token_hex).await? {
            Some(binding) => Ok(!binding.invalidated && binding.consumed_by == Some(verifier_id)),
            None => Ok(false),
        }
    }

    /// Invalida el token (compensación de la saga). Idempotente.
    #[instrument(skip(self))]
    pub async fn invalidate(&self, token_hex: &str) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;

        let affected = connection
            .execute(
                "UPDATE qr_tokens SET invalidated = 1 WHERE token_hex = ?1",
                params![token_hex],
            )
            .await?;

        if affected == 0 {
            warn!("👻 [TOKEN_VOID]: Invalidation targeted an unknown token.");
        }
        Ok(())
    }

    /// Tokens no invalidados de una corrida, en orden de ranura.
    pub async fn tokens_for_run(
        &self,
        protocol_run_id: Uuid,
    ) -> Result<Vec<(String, TokenBinding)>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT token_hex, subject_id, verifier_slot, expires_at, consumed_by
                 FROM qr_tokens
                 WHERE protocol_run_id = ?1 AND invalidated = 0
                 ORDER BY verifier_slot ASC",
                params![protocol_run_id.to_string()],
            )
            .await?;

        let mut bindings = Vec::new();
        while let Some(row) = rows.next().await? {
            let token_hex: String = row.get(0)?;
            let subject_raw: String = row.get(1)?;
            let slot: i64 = row.get(2)?;
            let expires_raw: String = row.get(3)?;
            let consumed_raw: Option<String> = row.get(4)?;

            bindings.push((
                token_hex,
                TokenBinding {
                    subject_id: Uuid::parse_str(&subject_raw).map_err(|fault| {
                        DbError::MappingError(format!("TOKEN_SUBJECT_FAULT: {}", fault))
                    })?,
                    protocol_run_id,
                    verifier_slot: slot as u8,
                    expires_at: parse_timestamp(&expires_raw).ok_or_else(|| {
                        DbError::MappingError(format!("TOKEN_EXPIRY_FAULT: {}", expires_raw))
                    })?,
                    invalidated: false,
                    consumed_by: consumed_raw
                        .map(|raw| {
                            Uuid::parse_str(&raw).map_err(|fault| {
                                DbError::MappingError(format!("TOKEN_CONSUMER_FAULT: {}", fault))
                            })
                        })
                        .transpose()?,
                },
            ));
        }
        Ok(bindings)
    }

    /// Purga física de tokens vencidos; retorna la cantidad retirada.
    #[instrument(skip(self))]
    pub async fn prune_expired(&self) -> Result<u64, DbError> {
        let connection = self.database_client.get_connection()?;

        let pruned = connection
            .execute(
                "DELETE FROM qr_tokens WHERE expires_at < ?1",
                params![seal_timestamp(Utc::now())],
            )
            .await?;

        if pruned > 0 {
            info!("💀 [TOKEN_REAPER]: Purged {} expired QR tokens.", pruned);
        }
        Ok(pruned)
    }
}

// --- PUERTO DEL DOMINIO ---

#[async_trait::async_trait]
impl TokenStorePort for TokenRepository {
    async fn put_if_absent(&self, token_hex: &str, binding: TokenBinding) -> Result<bool, PortFault> {
        TokenRepository::put_if_absent(self, token_hex, &binding)
            .await
            .map_err(|db_fault| PortFault::Unavailable(db_fault.to_string()))
    }

    async fn resolve(&self, token_hex: &str) -> Result<Option<TokenBinding>, PortFault> {
        TokenRepository::resolve(self, token_hex)
            .await
            .map_err(|db_fault| PortFault::Unavailable(db_fault.to_string()))
    }

    async fn consume(&self, token_hex: &str, verifier_id: Uuid) -> Result<bool, PortFault> {
        TokenRepository::consume(self, token_hex, verifier_id)
            .await
            .map_err(|db_fault| PortFault::Unavailable(db_fault.to_string()))
    }

    async fn invalidate(&self, token_hex: &str) -> Result<(), PortFault> {
        TokenRepository::invalidate(self, token_hex)
            .await
            .map_err(|db_fault| PortFault::Unavailable(db_fault.to_string()))
    }

    async fn tokens_for_run(
        &self,
        protocol_run_id: Uuid,
    ) -> Result<Vec<(String, TokenBinding)>, PortFault> {
        TokenRepository::tokens_for_run(self, protocol_run_id)
            .await
            .map_err(|db_fault| PortFault::Unavailable(db_fault.to_string()))
    }
}
