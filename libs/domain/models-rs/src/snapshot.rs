// [libs/domain/models-rs/src/snapshot.rs]
/*!
 * =================================================================
 * APARATO: SUBJECT SNAPSHOT MODELS (V5.2 - DERIVED PROJECTION)
 * CLASIFICACIÓN: DOMAIN ENTITIES (L2)
 * RESPONSABILIDAD: VISTA DERIVADA DEL ESTADO DE VERIFICACIÓN POR SUJETO
 *
 * # Mathematical Proof (Fold Equivalence):
 * El snapshot DEBE ser igual al pliegue del journal a través del modelo
 * de puntaje. Cualquier divergencia entre la proyección en RAM y el
 * re-pliegue completo es un defecto fatal que detiene al orquestador.
 * =================================================================
 */

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;
use uuid::Uuid;

use crate::journal::MethodCompletion;
use crate::method::{VerificationLevel, VerificationMethod};
use crate::subject::SubjectClass;

/// Estados públicos de una corrida de protocolo hijo.
#[typeshare]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolState {
    Pending,
    Waiting,
    AwaitingReview,
    Completed,
    Failed,
    Cancelled,
    Compensating,
}

impl ProtocolState {
    /// Un estado terminal jamás transiciona de nuevo.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProtocolState::Completed | ProtocolState::Failed | ProtocolState::Cancelled
        )
    }
}

/// Una ejecución de un protocolo de verificación hijo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolRun {
    pub id: Uuid,
    pub method: VerificationMethod,
    pub state: ProtocolState,
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    /// Parámetros específicos del método (destino del código, referencia documental).
    pub params: serde_json::Value,
}

/// Vista derivada del estado de verificación de un sujeto.
///
/// Contiene únicamente compleciones vigentes (ni revocadas ni expiradas);
/// el rastro histórico completo vive en el journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectSnapshot {
    pub subject_id: Uuid,
    pub class: SubjectClass,
    pub score: i64,
    pub level: VerificationLevel,
    pub completions: BTreeMap<VerificationMethod, Vec<MethodCompletion>>,
    /// Atestadores ya registrados por método, para el veto de duplicados.
    pub attestors: BTreeMap<VerificationMethod, BTreeSet<Uuid>>,
    pub active_protocols: BTreeMap<VerificationMethod, ProtocolRun>,
    /// Sujeto eliminado de la plataforma; el stream queda sellado.
    pub tombstoned: bool,
    /// Última secuencia del journal absorbida por esta proyección.
    pub last_seq: u64,
    pub updated_at: DateTime<Utc>,
}

impl SubjectSnapshot {
    /// Proyección virgen de un sujeto sin journal.
    pub fn genesis(subject_id: Uuid) -> Self {
        Self {
            subject_id,
            class: SubjectClass::Individual,
            score: 0,
            level: VerificationLevel::Unverified,
            completions: BTreeMap::new(),
            attestors: BTreeMap::new(),
            active_protocols: BTreeMap::new(),
            tombstoned: false,
            last_seq: 0,
            updated_at: DateTime::<Utc>::MIN_UTC,
        }
    }

    /// Cantidad de compleciones vigentes de un método.
    pub fn completion_count(&self, method: VerificationMethod) -> u32 {
        self.completions
            .get(&method)
            .map(|entries| entries.len() as u32)
            .unwrap_or(0)
    }

    /// Mapa método → conteo vigente, para la consulta 'CompletedMethods'.
    pub fn completed_counts(&self) -> BTreeMap<VerificationMethod, u32> {
        self.completions
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(method, entries)| (*method, entries.len() as u32))
            .collect()
    }

    /// Expiración más próxima entre las compleciones vigentes de un método.
    pub fn next_expiry(&self, method: VerificationMethod) -> Option<DateTime<Utc>> {
        self.completions
            .get(&method)?
            .iter()
            .filter_map(|completion| completion.expires_at)
            .min()
    }
}
