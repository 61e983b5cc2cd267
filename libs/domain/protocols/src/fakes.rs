// [libs/domain/protocols/src/fakes.rs]
/*!
 * =================================================================
 * APARATO: PROVING GROUNDS PORT DOUBLES (V3.0 - IN-MEMORY STRATA)
 * CLASIFICACIÓN: TEST HARNESS (ESTRATO L2-MIRROR)
 * RESPONSABILIDAD: DOBLES EN MEMORIA DE LOS PUERTOS DE COLABORADOR
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SEMANTIC PARITY: Cada doble reproduce la semántica atómica del
 *    colaborador real (CAS de tokens, secuencias del journal).
 * 2. FAULT INJECTION: Banderas atómicas permiten simular colapsos de
 *    colaborador para certificar compensaciones y reintentos.
 * =================================================================
 */

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;
use veritas_domain_models::{
    EventDraft, SubjectSnapshot, VerificationEvent, VerifierRecord,
};

use crate::ports::{
    CodeDeliveryPort, JournalPort, NotificationPort, PortFault, ReviewQueuePort, ReviewTask,
    TokenBinding, TokenStorePort, VerifierDirectoryPort,
};

/// Entrega de códigos que registra cada despacho.
#[derive(Default)]
pub struct RecordingCodeDelivery {
    pub dispatched: Mutex<Vec<(String, String)>>,
    pub fail_all: AtomicBool,
}

#[async_trait]
impl CodeDeliveryPort for RecordingCodeDelivery {
    async fn send_code(&self, target: &str, code: &str, _ttl_minutes: i64) -> Result<(), PortFault> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(PortFault::Unavailable("delivery_sink_down".into()));
        }
        self.dispatched
            .lock()
            .expect("Delivery ledger poisoned")
            .push((target.to_string(), code.to_string()));
        Ok(())
    }
}

impl RecordingCodeDelivery {
    /// Último código despachado hacia un destino.
    pub fn last_code_for(&self, target: &str) -> Option<String> {
        self.dispatched
            .lock()
            .expect("Delivery ledger poisoned")
            .iter()
            .rev()
            .find(|(known_target, _)| known_target == target)
            .map(|(_, code)| code.clone())
    }

    pub fn dispatch_count(&self) -> usize {
        self.dispatched.lock().expect("Delivery ledger poisoned").len()
    }
}

/// Cola de revisión que retiene las tareas encoladas.
#[derive(Default)]
pub struct RecordingReviewQueue {
    pub enqueued: Mutex<Vec<ReviewTask>>,
}

#[async_trait]
impl ReviewQueuePort for RecordingReviewQueue {
    async fn enqueue_review(&self, task: ReviewTask) -> Result<String, PortFault> {
        let mut ledger = self.enqueued.lock().expect("Review ledger poisoned");
        ledger.push(task);
        Ok(format!("review-{}", ledger.len()))
    }
}

/// Almacén de tokens en memoria con semántica CAS bit-perfecta.
#[derive(Default)]
pub struct MemoryTokenStore {
    rows: Mutex<HashMap<String, TokenBinding>>,
    /// Inyección de fallo: toda invalidación colapsa (compensación atascada).
    pub fail_invalidation: AtomicBool,
}

#[async_trait]
impl TokenStorePort for MemoryTokenStore {
    async fn put_if_absent(&self, token_hex: &str, binding: TokenBinding) -> Result<bool, PortFault> {
        let mut rows = self.rows.lock().expect("Token strata poisoned");
        if rows.contains_key(token_hex) {
            return Ok(false);
        }
        rows.insert(token_hex.to_string(), binding);
        Ok(true)
    }

    async fn resolve(&self, token_hex: &str) -> Result<Option<TokenBinding>, PortFault> {
        Ok(self.rows.lock().expect("Token strata poisoned").get(token_hex).cloned())
    }

    async fn consume(&self, token_hex: &str, verifier_id: Uuid) -> Result<bool, PortFault> {
        let mut rows = self.rows.lock().expect("Token strata poisoned");
        match rows.get_mut(token_hex) {
            Some(binding) if binding.invalidated => Ok(false),
            Some(binding) => match binding.consumed_by {
                Some(consumer) => Ok(consumer == verifier_id),
                None => {
                    binding.consumed_by = Some(verifier_id);
                    Ok(true)
                }
            },
            None => Ok(false),
        }
    }

    async fn invalidate(&self, token_hex: &str) -> Result<(), PortFault> {
        if self.fail_invalidation.load(Ordering::SeqCst) {
            return Err(PortFault::Unavailable("token_store_down".into()));
        }
        let mut rows = self.rows.lock().expect("Token strata poisoned");
        if let Some(binding) = rows.get_mut(token_hex) {
            binding.invalidated = true;
        }
        Ok(())
    }

    async fn tokens_for_run(
        &self,
        protocol_run_id: Uuid,
    ) -> Result<Vec<(String, TokenBinding)>, PortFault> {
        let rows = self.rows.lock().expect("Token strata poisoned");
        let mut matches: Vec<(String, TokenBinding)> = rows
            .iter()
            .filter(|(_, binding)| {
                binding.protocol_run_id == protocol_run_id && !binding.invalidated
            })
            .map(|(token, binding)| (token.clone(), binding.clone()))
            .collect();
        matches.sort_by_key(|(_, binding)| binding.verifier_slot);
        Ok(matches)
    }
}

impl MemoryTokenStore {
    /// Tokens vigentes (no invalidados) de una corrida, en orden de ranura.
    pub fn live_tokens_for_run(&self, protocol_run_id: Uuid) -> Vec<String> {
        let rows = self.rows.lock().expect("Token strata poisoned");
        let mut live: Vec<(u8, String)> = rows
            .iter()
            .filter(|(_, binding)| {
                binding.protocol_run_id == protocol_run_id && !binding.invalidated
            })
            .map(|(token, binding)| (binding.verifier_slot, token.clone()))
            .collect();
        live.sort();
        live.into_iter().map(|(_, token)| token).collect()
    }

    pub fn all_invalidated(&self, protocol_run_id: Uuid) -> bool {
        let rows = self.rows.lock().expect("Token strata poisoned");
        rows.values()
            .filter(|binding| binding.protocol_run_id == protocol_run_id)
            .all(|binding| binding.invalidated)
    }
}

/// Directorio de verificadores sembrado en memoria.
#[derive(Default)]
pub struct MemoryVerifierDirectory {
    records: Mutex<HashMap<Uuid, VerifierRecord>>,
    snapshots: Mutex<HashMap<Uuid, SubjectSnapshot>>,
}

impl MemoryVerifierDirectory {
    pub fn seed_verifier(&self, record: VerifierRecord, snapshot: SubjectSnapshot) {
        self.records
            .lock()
            .expect("Directory strata poisoned")
            .insert(record.subject_id, record);
        self.snapshots
            .lock()
            .expect("Snapshot strata poisoned")
            .insert(snapshot.subject_id, snapshot);
    }

    pub fn seed_snapshot(&self, snapshot: SubjectSnapshot) {
        self.snapshots
            .lock()
            .expect("Snapshot strata poisoned")
            .insert(snapshot.subject_id, snapshot);
    }

    pub fn confirmations_of(&self, verifier_id: Uuid) -> u32 {
        self.records
            .lock()
            .expect("Directory strata poisoned")
            .get(&verifier_id)
            .map(|record| record.successful_confirmations)
            .unwrap_or(0)
    }
}

#[async_trait]
impl VerifierDirectoryPort for MemoryVerifierDirectory {
    async fn fetch_verifier(&self, verifier_id: Uuid) -> Result<Option<VerifierRecord>, PortFault> {
        Ok(self
            .records
            .lock()
            .expect("Directory strata poisoned")
            .get(&verifier_id)
            .cloned())
    }

    async fn fetch_snapshot(&self, subject_id: Uuid) -> Result<SubjectSnapshot, PortFault> {
        Ok(self
            .snapshots
            .lock()
            .expect("Snapshot strata poisoned")
            .get(&subject_id)
            .cloned()
            .unwrap_or_else(|| SubjectSnapshot::genesis(subject_id)))
    }

    async fn increment_confirmations(&self, verifier_id: Uuid) -> Result<(), PortFault> {
        let mut records = self.records.lock().expect("Directory strata poisoned");
        let record = records
            .get_mut(&verifier_id)
            .ok_or_else(|| PortFault::Conflict("verifier_unknown".into()))?;
        record.successful_confirmations += 1;
        Ok(())
    }

    async fn decrement_confirmations(&self, verifier_id: Uuid) -> Result<(), PortFault> {
        let mut records = self.records.lock().expect("Directory strata poisoned");
        let record = records
            .get_mut(&verifier_id)
            .ok_or_else(|| PortFault::Conflict("verifier_unknown".into()))?;
        record.successful_confirmations = record.successful_confirmations.saturating_sub(1);
        Ok(())
    }
}

/// Journal en memoria con secuencias monótonas por sujeto.
#[derive(Default)]
pub struct MemoryJournal {
    streams: Mutex<HashMap<Uuid, Vec<VerificationEvent>>>,
}

#[async_trait]
impl JournalPort for MemoryJournal {
    async fn append(&self, subject_id: Uuid, draft: EventDraft) -> Result<u64, PortFault> {
        let mut streams = self.streams.lock().expect("Journal strata poisoned");
        let stream = streams.entry(subject_id).or_default();
        let seq = stream.len() as u64 + 1;

        stream.push(VerificationEvent {
            seq,
            at: Utc::now(),
            kind: draft.kind,
            method: draft.method,
            actor_subject_id: draft.actor_subject_id,
            protocol_run_id: draft.protocol_run_id,
            data: draft.data,
        });
        Ok(seq)
    }
}

impl MemoryJournal {
    pub fn events_of(&self, subject_id: Uuid) -> Vec<VerificationEvent> {
        self.streams
            .lock()
            .expect("Journal strata poisoned")
            .get(&subject_id)
            .cloned()
            .unwrap_or_default()
    }
}

/// Sumidero de notificaciones que registra cada entrega.
#[derive(Default)]
pub struct RecordingNotifier {
    pub delivered: Mutex<Vec<(Uuid, String, serde_json::Value)>>,
}

#[async_trait]
impl NotificationPort for RecordingNotifier {
    async fn deliver(
        &self,
        subject_id: Uuid,
        kind: &str,
        payload: serde_json::Value,
    ) -> Result<(), PortFault> {
        self.delivered
            .lock()
            .expect("Notification ledger poisoned")
            .push((subject_id, kind.to_string(), payload));
        Ok(())
    }
}

impl RecordingNotifier {
    pub fn count_of_kind(&self, kind: &str) -> usize {
        self.delivered
            .lock()
            .expect("Notification ledger poisoned")
            .iter()
            .filter(|(_, known_kind, _)| known_kind == kind)
            .count()
    }
}
