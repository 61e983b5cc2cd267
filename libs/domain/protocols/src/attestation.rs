// [libs/domain/protocols/src/attestation.rs]
/*!
 * =================================================================
 * APARATO: ATTESTATION INTAKE PROTOCOL (V3.1 - THIRD PARTY VOUCH)
 * CLASIFICACIÓN: DOMAIN STATE MACHINE (ESTRATO L2)
 * RESPONSABILIDAD: INGESTA DE ATESTACIONES Y REFERENCIAS AUTORIZADAS
 *
 * Estados: Pending → AwaitingAttestation → Completed. El atestador debe
 * portar nivel propio ≥ Minimal; el multiplicador del método se aplica
 * en el orquestador, no aquí.
 * =================================================================
 */

use chrono::Utc;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};
use veritas_domain_models::{EventDraft, EventKind, FailureReason, VerificationLevel};

use crate::backoff::retry_with_backoff;
use crate::contract::{
    respond, ProtocolContext, ProtocolOutcome, ProtocolSignal, SignalAck, SignalRejection,
};

/// Ejecuta la ingesta de una atestación hasta su desenlace terminal.
#[instrument(skip(context, signals), fields(method = %context.method.as_label(), run = %context.protocol_run_id))]
pub async fn execute(
    context: ProtocolContext,
    mut signals: mpsc::Receiver<ProtocolSignal>,
) -> ProtocolOutcome {
    loop {
        let wait_budget = (context.deadline - Utc::now()).to_std().unwrap_or_default();

        tokio::select! {
            incoming = signals.recv() => match incoming {
                Some(ProtocolSignal::Attestation { attestor_id, statement, reply }) => {
                    // Autorización mínima: el atestador debe ser al menos Minimal.
                    let attestor_snapshot = match context
                        .collaborators
                        .verifier_directory
                        .fetch_snapshot(attestor_id)
                        .await
                    {
                        Ok(snapshot) => snapshot,
                        Err(directory_fault) => {
                            warn!("⚠️ [ATTESTATION]: Attestor snapshot unavailable: {}.", directory_fault);
                            respond(reply, SignalAck::Rejected(SignalRejection::AttestorDenied));
                            continue;
                        }
                    };

                    if attestor_snapshot.level < VerificationLevel::Minimal {
                        warn!("⛔ [ATTESTATION]: Attestor [{}] below Minimal level.", attestor_id);
                        respond(reply, SignalAck::Rejected(SignalRejection::AttestorDenied));
                        continue;
                    }

                    // Sellado de la evidencia de atestación en el journal.
                    let draft = EventDraft::bare(EventKind::AttestationReceived, Some(context.method))
                        .with_actor(attestor_id)
                        .with_run(context.protocol_run_id)
                        .with_data(json!({ "statement": statement }));

                    let sealing = retry_with_backoff(
                        context.tuning.side_effect_retry,
                        "attestation_seal",
                        || context.collaborators.journal.append(context.subject_id, draft.clone()),
                    )
                    .await;

                    if sealing.is_err() {
                        respond(reply, SignalAck::Rejected(SignalRejection::NotAwaiting));
                        return ProtocolOutcome::Failed(FailureReason::CollaboratorUnavailable);
                    }

                    respond(reply, SignalAck::Accepted);
                    info!("🗣️ [ATTESTATION]: Vouch absorbed from attestor [{}].", attestor_id);

                    return ProtocolOutcome::Completed {
                        evidence_ref: attestor_id.to_string(),
                        data: json!({ "attestor_id": attestor_id }),
                    };
                }
                Some(ProtocolSignal::Cancel) => return ProtocolOutcome::Cancelled,
                Some(other) => reject_unawaited(other),
                None => return ProtocolOutcome::Cancelled,
            },
            _ = tokio::time::sleep(wait_budget) => {
                return ProtocolOutcome::Failed(FailureReason::Timeout);
            }
        }
    }
}

fn reject_unawaited(signal: ProtocolSignal) {
    match signal {
        ProtocolSignal::CodeEntered { reply, .. }
        | ProtocolSignal::VerifierConfirmation { reply, .. } => {
            respond(reply, SignalAck::Rejected(SignalRejection::NotAwaiting));
        }
        _ => {}
    }
}
