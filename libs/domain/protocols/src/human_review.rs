// [libs/domain/protocols/src/human_review.rs]
/*!
 * =================================================================
 * APARATO: HUMAN REVIEW PROTOCOL (V3.2 - LONG WAIT ADJUDICATION)
 * CLASIFICACIÓN: DOMAIN STATE MACHINE (ESTRATO L2)
 * RESPONSABILIDAD: ESPERA DE ADJUDICACIÓN HUMANA SOBRE DOCUMENTOS
 *
 * Estados: Pending → Uploading → AwaitingReview → (Completed | Failed |
 * Cancelled). El blob documental vive en el almacenamiento externo; el
 * motor retiene únicamente su referencia y el hash de evidencia.
 * =================================================================
 */

use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};
use veritas_domain_models::FailureReason;

use crate::backoff::retry_with_backoff;
use crate::contract::{
    respond, ProtocolContext, ProtocolOutcome, ProtocolSignal, SignalAck, SignalRejection,
};
use crate::ports::ReviewTask;

/// Parámetros de la revisión: referencia opaca al blob documental.
#[derive(Debug, Clone, Deserialize)]
pub struct HumanReviewParams {
    pub document_ref: String,
}

/// Ejecuta la espera de revisión humana hasta su desenlace terminal.
#[instrument(skip(context, params, signals), fields(method = %context.method.as_label(), run = %context.protocol_run_id))]
pub async fn execute(
    context: ProtocolContext,
    params: serde_json::Value,
    mut signals: mpsc::Receiver<ProtocolSignal>,
) -> ProtocolOutcome {
    let params: HumanReviewParams = match serde_json::from_value(params) {
        Ok(parsed) => parsed,
        Err(parse_fault) => {
            warn!("🚫 [HUMAN_REVIEW]: Malformed params rejected: {}", parse_fault);
            return ProtocolOutcome::Failed(FailureReason::Rejected {
                detail: Some("invalid_params".into()),
            });
        }
    };

    // La evidencia es el hash del documento; el blob jamás entra al motor.
    let evidence_ref = hex::encode(Sha256::digest(params.document_ref.as_bytes()));

    // 1. ENCOLADO DE LA TAREA (efecto colateral reintenable)
    let review_task = ReviewTask {
        subject_id: context.subject_id,
        method: context.method,
        protocol_run_id: context.protocol_run_id,
        document_ref: params.document_ref.clone(),
        deadline: context.deadline,
    };

    let review_id = match retry_with_backoff(
        context.tuning.side_effect_retry,
        "review_enqueue",
        || context.collaborators.review_queue.enqueue_review(review_task.clone()),
    )
    .await
    {
        Ok(review_id) => review_id,
        Err(_) => return ProtocolOutcome::Failed(FailureReason::CollaboratorUnavailable),
    };

    info!("📋 [HUMAN_REVIEW]: Task [{}] enqueued; awaiting adjudication.", review_id);

    // 2. ESPERA LARGA DE LA DECISIÓN (deadline nominal: 30 días)
    loop {
        let wait_budget = (context.deadline - Utc::now()).to_std().unwrap_or_default();

        tokio::select! {
            incoming = signals.recv() => match incoming {
                Some(ProtocolSignal::ReviewDecision { approved, reason }) => {
                    return if approved {
                        info!("✅ [HUMAN_REVIEW]: Document approved for run [{}].", context.protocol_run_id);
                        ProtocolOutcome::Completed {
                            evidence_ref,
                            data: serde_json::json!({ "review_id": review_id }),
                        }
                    } else {
                        warn!("🚫 [HUMAN_REVIEW]: Document rejected for run [{}].", context.protocol_run_id);
                        ProtocolOutcome::Failed(FailureReason::Rejected { detail: reason })
                    };
                }
                Some(ProtocolSignal::Cancel) => return ProtocolOutcome::Cancelled,
                Some(other) => reject_unawaited(other),
                None => return ProtocolOutcome::Cancelled,
            },
            _ = tokio::time::sleep(wait_budget) => {
                warn!("⏳ [HUMAN_REVIEW]: Adjudication window elapsed for run [{}].", context.protocol_run_id);
                return ProtocolOutcome::Failed(FailureReason::Timeout);
            }
        }
    }
}

fn reject_unawaited(signal: ProtocolSignal) {
    match signal {
        ProtocolSignal::CodeEntered { reply, .. }
        | ProtocolSignal::VerifierConfirmation { reply, .. }
        | ProtocolSignal::Attestation { reply, .. } => {
            respond(reply, SignalAck::Rejected(SignalRejection::NotAwaiting));
        }
        _ => {}
    }
}
