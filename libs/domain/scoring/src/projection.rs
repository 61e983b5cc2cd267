// [libs/domain/scoring/src/projection.rs]
/*!
 * =================================================================
 * APARATO: JOURNAL PROJECTION FOLD (V5.1 - DETERMINISTIC REPLAY)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: PLIEGUE PURO DEL JOURNAL HACIA EL SNAPSHOT
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SINGLE FOLD AUTHORITY: Reconstrucción post-crash, recomputo tras
 *    revocación/expiración y certificación P1 comparten esta función.
 * 2. GAP SENTINEL: Cualquier hueco de secuencia detiene el pliegue con
 *    un fallo semántico; un Ledger con huecos es evidencia de corrupción.
 * 3. CATALOG-DERIVED EXPIRY: 'expires_at' se deriva del catálogo durante
 *    el pliegue, garantizando la Ley I4 sin confiar en el payload.
 *
 * # Mathematical Proof (Replay Determinism):
 * El pliegue es una función pura fold(J) → S: no lee reloj ni entorno.
 * Para cualquier journal J, fold(J) es único, y fold(fold(J[..k]), J[k..])
 * = fold(J) para todo corte k (asociatividad del checkpoint).
 * =================================================================
 */

use thiserror::Error;
use uuid::Uuid;
use veritas_domain_models::{
    EventKind, MethodCompletion, ProtocolRun, ProtocolState, SubjectClass, SubjectSnapshot,
    VerificationEvent,
};

use crate::engine;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FoldError {
    /// El stream presentó 'seq' no contiguos (esperado, observado).
    #[error("[L2_FOLD_FAULT]: SEQUENCE_GAP_DETECTED -> expected {expected}, observed {observed}")]
    SequenceGap { expected: u64, observed: u64 },
}

/// Pliega el journal completo de un sujeto hacia su snapshot.
pub fn fold(
    subject_id: Uuid,
    events: impl IntoIterator<Item = VerificationEvent>,
) -> Result<SubjectSnapshot, FoldError> {
    fold_from(SubjectSnapshot::genesis(subject_id), events)
}

/// Pliega eventos sobre una proyección base (marcador de checkpoint).
pub fn fold_from(
    base: SubjectSnapshot,
    events: impl IntoIterator<Item = VerificationEvent>,
) -> Result<SubjectSnapshot, FoldError> {
    let mut snapshot = base;

    for event in events {
        let expected = snapshot.last_seq + 1;
        if event.seq != expected {
            return Err(FoldError::SequenceGap { expected, observed: event.seq });
        }

        absorb(&mut snapshot, &event);
        snapshot.last_seq = event.seq;
        snapshot.updated_at = event.at;
    }

    snapshot.score = engine::score(&snapshot.completions, snapshot.class);
    snapshot.level = engine::level(snapshot.score);
    Ok(snapshot)
}

/// Absorbe un único evento en la proyección.
fn absorb(snapshot: &mut SubjectSnapshot, event: &VerificationEvent) {
    match event.kind {
        EventKind::MethodStarted => {
            if let Some(class_value) = event.data.get("subject_class") {
                if let Ok(class) = serde_json::from_value::<SubjectClass>(class_value.clone()) {
                    snapshot.class = class;
                }
            }

            if let Some(method) = event.method {
                let deadline = event
                    .data
                    .get("deadline")
                    .and_then(|value| value.as_str())
                    .and_then(|raw| raw.parse().ok())
                    .unwrap_or(event.at);

                snapshot.active_protocols.insert(
                    method,
                    ProtocolRun {
                        id: event.protocol_run_id.unwrap_or_else(Uuid::nil),
                        method,
                        state: ProtocolState::Pending,
                        started_at: event.at,
                        deadline,
                        params: event
                            .data
                            .get("params")
                            .cloned()
                            .unwrap_or(serde_json::Value::Null),
                    },
                );
            }
        }

        EventKind::MethodCompleted => {
            if let Some(method) = event.method {
                snapshot.active_protocols.remove(&method);

                let entries = snapshot.completions.entry(method).or_default();
                let evidence_ref = event
                    .data
                    .get("evidence_ref")
                    .and_then(|value| value.as_str())
                    .unwrap_or_default()
                    .to_string();

                entries.push(MethodCompletion {
                    method,
                    sequence_index: entries.len() as u32 + 1,
                    completed_at: event.at,
                    evidence_ref,
                    // Derivación del catálogo: vigencia = compleción + decay_days.
                    expires_at: engine::expiry_for(method, event.at),
                    revoked_at: None,
                    revocation_reason: None,
                });
            }
        }

        EventKind::MethodFailed => {
            if let Some(method) = event.method {
                snapshot.active_protocols.remove(&method);
            }
        }

        EventKind::MethodRevoked => {
            if let Some(method) = event.method {
                snapshot.active_protocols.remove(&method);

                // La revocación sella la compleción vigente más reciente.
                if let Some(entries) = snapshot.completions.get_mut(&method) {
                    entries.pop();
                    if entries.is_empty() {
                        snapshot.completions.remove(&method);
                    }
                }
            }
        }

        EventKind::MethodExpired => {
            if let Some(method) = event.method {
                if let Some(entries) = snapshot.completions.get_mut(&method) {
                    // Cada disparo retira únicamente la compleción de
                    // vencimiento más temprano.
                    let earliest = entries
                        .iter()
                        .enumerate()
                        .filter_map(|(index, entry)| entry.expires_at.map(|at| (index, at)))
                        .min_by_key(|(_, at)| *at)
                        .map(|(index, _)| index);

                    if let Some(index) = earliest {
                        entries.remove(index);
                    }
                    if entries.is_empty() {
                        snapshot.completions.remove(&method);
                    }
                }
            }
        }

        EventKind::AttestationReceived => {
            if let (Some(method), Some(actor)) = (event.method, event.actor_subject_id) {
                snapshot.attestors.entry(method).or_default().insert(actor);
            }
        }

        EventKind::SubjectTombstoned => {
            snapshot.tombstoned = true;
            snapshot.active_protocols.clear();
        }

        // Eventos informativos: el nivel se recomputa siempre del puntaje,
        // y las confirmaciones viven en el rastro del journal.
        EventKind::LevelChanged
        | EventKind::VerifierConfirmed
        | EventKind::VerifierConfirmationRevoked
        | EventKind::SnapshotRebuilt => {}
    }
}
