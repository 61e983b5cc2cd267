// [libs/infra/db-turso/src/repositories/journal.rs]
/*!
 * =================================================================
 * APARATO: VERIFICATION JOURNAL REPOSITORY (V5.0 - OPTIMISTIC CAS)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: ANEXO ATÓMICO Y PROYECCIÓN CACHEADA DEL LEDGER
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. PHYSICAL CAS: La clave primaria (subject_id, seq) convierte cada
 *    anexo en un compare-and-swap físico: el perdedor de la carrera
 *    recibe 'SequenceConflict' y relee la cola del stream.
 * 2. READ-YOUR-WRITE: La proyección cacheada se invalida en cada anexo;
 *    un 'snapshot' posterior refleja siempre el evento sellado.
 * 3. DURABILITY CONTRACT: Cuando 'append' retorna, el evento quedó
 *    comprometido en el Motor A; las notificaciones jamás preceden
 *    al commit.
 *
 * # Mathematical Proof (Gap-Free Sequencing):
 * seq(n+1) = seq(n) + 1 se impone por inserción condicionada al índice
 * primario; el pliegue detecta cualquier hueco residual como corrupción.
 * =================================================================
 */

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use libsql::params;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use veritas_domain_models::{
    EventDraft, EventKind, SubjectSnapshot, VerificationEvent, VerificationMethod,
};
use veritas_domain_scoring::projection;

use crate::errors::DbError;
use crate::repositories::{parse_timestamp, seal_timestamp};
use crate::TursoClient;

/// Intentos máximos del anexo auto-secuenciado ante carreras de 'seq'.
const AUTO_APPEND_MAX_RACES: u32 = 8;

/// Repositorio de autoridad única del journal de verificación.
#[derive(Clone)]
pub struct JournalRepository {
    database_client: TursoClient,
    /// Proyección cacheada por sujeto, validada contra la cola del stream.
    projection_cache: Arc<Mutex<HashMap<Uuid, SubjectSnapshot>>>,
}

impl JournalRepository {
    pub fn new(client: TursoClient) -> Self {
        Self {
            database_client: client,
            projection_cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /**
     * Anexa un evento al stream del sujeto.
     *
     * # Logic:
     * - Con 'expected_last_seq': inserción única en expected+1; la colisión
     *   del índice primario reporta 'SequenceConflict' (relectura del caller).
     * - Sin expectativa: lee la cola y reintenta la carrera hasta el tope.
     *
     * # Errors:
     * - `DbError::SequenceConflict`: carrera perdida; reintenable con lectura fresca.
     */
    #[instrument(skip(self, draft), fields(subject = %subject_id, kind = %draft.kind.as_label()))]
    pub async fn append(
        &self,
        subject_id: Uuid,
        draft: &EventDraft,
        expected_last_seq: Option<u64>,
    ) -> Result<u64, DbError> {
        if let Some(expected) = expected_last_seq {
            let sealed_seq = expected + 1;
            return match self.try_insert(subject_id, sealed_seq, draft).await {
                Ok(()) => {
                    self.invalidate(subject_id);
                    Ok(sealed_seq)
                }
                Err(insert_fault) if is_unique_violation(&insert_fault) => {
                    Err(DbError::SequenceConflict { expected_last_seq: expected })
                }
                Err(other) => Err(other),
            };
        }

        // Modo auto-secuenciado: carrera acotada contra escritores hermanos.
        for race_round in 0..AUTO_APPEND_MAX_RACES {
            let tail = self.last_seq(subject_id).await?;
            let sealed_seq = tail + 1;

            match self.try_insert(subject_id, sealed_seq, draft).await {
                Ok(()) => {
                    self.invalidate(subject_id);
                    if race_round > 0 {
                        debug!("🔁 [JOURNAL]: Sequence race resolved after {} rounds.", race_round + 1);
                    }
                    return Ok(sealed_seq);
                }
                Err(insert_fault) if is_unique_violation(&insert_fault) => continue,
                Err(other) => return Err(other),
            }
        }

        warn!("⛔ [JOURNAL]: Sequence race exhausted for subject [{}].", subject_id);
        Err(DbError::SequenceConflict { expected_last_seq: self.last_seq(subject_id).await? })
    }

    async fn try_insert(
        &self,
        subject_id: Uuid,
        seq: u64,
        draft: &EventDraft,
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;

        let data_serialized = serde_json::to_string(&draft.data)
            .map_err(|fault| DbError::MappingError(format!("EVENT_DATA_FAULT: {}", fault)))?;

        connection
            .execute(
                "INSERT INTO verification_journal
                    (subject_id, seq, at, kind, method, actor_subject_id, protocol_run_id, data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    subject_id.to_string(),
                    seq as i64,
                    seal_timestamp(chrono::Utc::now()),
                    draft.kind.as_label(),
                    draft.method.map(|method| method.as_label().to_string()),
                    draft.actor_subject_id.map(|actor| actor.to_string()),
                    draft.protocol_run_id.map(|run| run.to_string()),
                    data_serialized
                ],
            )
            .await?;

        Ok(())
    }

    /// Cola del stream: última secuencia sellada (0 para streams vírgenes).
    pub async fn last_seq(&self, subject_id: Uuid) -> Result<u64, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT COALESCE(MAX(seq), 0) FROM verification_journal WHERE subject_id = ?1",
                params![subject_id.to_string()],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            let tail: i64 = row.get(0)?;
            Ok(tail as u64)
        } else {
            Ok(0)
        }
    }

    /// Lectura ordenada del journal desde una secuencia dada (exclusiva).
    #[instrument(skip(self), fields(subject = %subject_id))]
    pub async fn read_journal(
        &self,
        subject_id: Uuid,
        from_seq: u64,
    ) -> Result<Vec<VerificationEvent>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT seq, at, kind, method, actor_subject_id, protocol_run_id, data
                 FROM verification_journal
                 WHERE subject_id = ?1 AND seq > ?2
                 ORDER BY seq ASC",
                params![subject_id.to_string(), from_seq as i64],
            )
            .await?;

        let mut events = Vec::new();
        while let Some(row) = rows.next().await? {
            events.push(map_row_to_event(&row)?);
        }
        Ok(events)
    }

    /**
     * Proyección del sujeto: cacheada y validada contra la cola del stream;
     * ante una proyección obsoleta, re-pliega el journal completo.
     */
    pub async fn snapshot(&self, subject_id: Uuid) -> Result<SubjectSnapshot, DbError> {
        let tail = self.last_seq(subject_id).await?;

        {
            let cache_guard = self.projection_cache.lock().expect("Projection cache poisoned");
            if let Some(cached) = cache_guard.get(&subject_id) {
                if cached.last_seq == tail {
                    return Ok(cached.clone());
                }
            }
        }

        let events = self.read_journal(subject_id, 0).await?;
        let rebuilt = projection::fold(subject_id, events)
            .map_err(|fold_fault| DbError::FoldViolation(fold_fault.to_string()))?;

        let mut cache_guard = self.projection_cache.lock().expect("Projection cache poisoned");
        cache_guard.insert(subject_id, rebuilt.clone());

        Ok(rebuilt)
    }

    /// Marca la proyección cacheada como obsoleta.
    pub fn invalidate(&self, subject_id: Uuid) {
        self.projection_cache
            .lock()
            .expect("Projection cache poisoned")
            .remove(&subject_id);
    }

    /// Inventario de sujetos con al menos un evento sellado.
    pub async fn list_subjects(&self) -> Result<Vec<Uuid>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query("SELECT DISTINCT subject_id FROM verification_journal", ())
            .await?;

        let mut subjects = Vec::new();
        while let Some(row) = rows.next().await? {
            let raw: String = row.get(0)?;
            let parsed = Uuid::parse_str(&raw)
                .map_err(|fault| DbError::MappingError(format!("SUBJECT_ID_FAULT: {}", fault)))?;
            subjects.push(parsed);
        }

        info!("📚 [JOURNAL]: {} subject streams inventoried.", subjects.len());
        Ok(subjects)
    }
}

/// Detección de colisión del índice primario (carrera de secuencia).
fn is_unique_violation(fault: &DbError) -> bool {
    match fault {
        DbError::QueryError(inner) => {
            let rendered = inner.to_string();
            rendered.contains("UNIQUE") || rendered.contains("PRIMARY KEY")
        }
        _ => false,
    }
}

/// Mapeo nominal fila → evento del dominio.
fn map_row_to_event(row: &libsql::Row) -> Result<VerificationEvent, DbError> {
    let seq: i64 = row.get(0)?;

    let at_raw: String = row.get(1)?;
    let at = parse_timestamp(&at_raw)
        .ok_or_else(|| DbError::MappingError(format!("TIMESTAMP_FAULT: {}", at_raw)))?;

    let kind_raw: String = row.get(2)?;
    let kind = EventKind::from_label(&kind_raw)
        .ok_or_else(|| DbError::MappingError(format!("EVENT_KIND_FAULT: {}", kind_raw)))?;

    let method = row
        .get::<Option<String>>(3)?
        .map(|label| {
            VerificationMethod::from_label(&label)
                .ok_or_else(|| DbError::MappingError(format!("METHOD_FAULT: {}", label)))
        })
        .transpose()?;

    let actor_subject_id = row
        .get::<Option<String>>(4)?
        .map(|raw| {
            Uuid::parse_str(&raw)
                .map_err(|fault| DbError::MappingError(format!("ACTOR_ID_FAULT: {}", fault)))
        })
        .transpose()?;

    let protocol_run_id = row
        .get::<Option<String>>(5)?
        .map(|raw| {
            Uuid::parse_str(&raw)
                .map_err(|fault| DbError::MappingError(format!("RUN_ID_FAULT: {}", fault)))
        })
        .transpose()?;

    let data_raw: String = row.get(6)?;
    let data = serde_json::from_str(&data_raw)
        .map_err(|fault| DbError::MappingError(format!("EVENT_DATA_FAULT: {}", fault)))?;

    Ok(VerificationEvent { seq: seq as u64, at, kind, method, actor_subject_id, protocol_run_id, data })
}

// --- PUERTO DEL DOMINIO: ANEXO AUTO-SECUENCIADO PARA PROTOCOLOS ---

#[async_trait::async_trait]
impl veritas_domain_protocols::JournalPort for JournalRepository {
    async fn append(
        &self,
        subject_id: Uuid,
        draft: EventDraft,
    ) -> Result<u64, veritas_domain_protocols::PortFault> {
        JournalRepository::append(self, subject_id, &draft, None)
            .await
            .map_err(|db_fault| veritas_domain_protocols::PortFault::Unavailable(db_fault.to_string()))
    }
}
