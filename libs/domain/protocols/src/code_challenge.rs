// [libs/domain/protocols/src/code_challenge.rs]
/*!
 * =================================================================
 * APARATO: CODE CHALLENGE PROTOCOL (V4.3 - CONSTANT TIME SEALED)
 * CLASIFICACIÓN: DOMAIN STATE MACHINE (ESTRATO L2)
 * RESPONSABILIDAD: DESAFÍO DE CÓDIGO DE 6 DÍGITOS (EMAIL / PHONE)
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. HASH-AT-REST: El código jamás se retiene en claro; solo persiste
 *    su hash SHA-256 salado durante la espera.
 * 2. CONSTANT TIME EQUALITY: La comparación usa 'subtle::ConstantTimeEq'
 *    sobre los digestos, cegando el canal temporal.
 * 3. BOUNDED ATTEMPTS: Cinco intentos nominales; el agotamiento o la
 *    expiración producen fallos semánticos distintos.
 *
 * Estados: Pending → Waiting → (Completed | Failed | Cancelled).
 * La supresión de re-entrega ante inicios duplicados ocurre en el
 * orquestador (precondición AlreadyActive + ledger de idempotencia).
 * =================================================================
 */

use chrono::{Duration, Utc};
use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};
use veritas_domain_models::FailureReason;

use crate::backoff::retry_with_backoff;
use crate::contract::{
    respond, ProtocolContext, ProtocolOutcome, ProtocolSignal, SignalAck, SignalRejection,
};

/// Parámetros del desafío: destino de entrega fuera de banda.
#[derive(Debug, Clone, Deserialize)]
pub struct CodeChallengeParams {
    /// Dirección de email o número E.164, según el método.
    pub target: String,
}

/// Material sellado del desafío durante la espera.
struct SealedChallenge {
    salt: [u8; 16],
    code_digest: [u8; 32],
}

impl SealedChallenge {
    fn seal(code: &str) -> Self {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill(&mut salt);

        Self { salt, code_digest: digest_with_salt(&salt, code) }
    }

    /// Comparación en tiempo constante del código ingresado.
    fn matches(&self, candidate: &str) -> bool {
        let candidate_digest = digest_with_salt(&self.salt, candidate);
        self.code_digest.ct_eq(&candidate_digest).into()
    }
}

fn digest_with_salt(salt: &[u8; 16], code: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(code.as_bytes());
    hasher.finalize().into()
}

/// Ejecuta el desafío de código hasta su desenlace terminal.
#[instrument(skip(context, params, signals), fields(method = %context.method.as_label(), run = %context.protocol_run_id))]
pub async fn execute(
    context: ProtocolContext,
    params: serde_json::Value,
    mut signals: mpsc::Receiver<ProtocolSignal>,
) -> ProtocolOutcome {
    let params: CodeChallengeParams = match serde_json::from_value(params) {
        Ok(parsed) => parsed,
        Err(parse_fault) => {
            warn!("🚫 [CODE_CHALLENGE]: Malformed params rejected: {}", parse_fault);
            return ProtocolOutcome::Failed(FailureReason::Rejected {
                detail: Some("invalid_params".into()),
            });
        }
    };

    // 1. FORJA Y DESPACHO DEL CÓDIGO (efecto colateral reintenable)
    let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32));
    let sealed = SealedChallenge::seal(&code);

    let delivery_verdict = retry_with_backoff(
        context.tuning.side_effect_retry,
        "code_delivery",
        || {
            context.collaborators.code_delivery.send_code(
                &params.target,
                &code,
                context.tuning.code_ttl_minutes,
            )
        },
    )
    .await;

    if delivery_verdict.is_err() {
        return ProtocolOutcome::Failed(FailureReason::CollaboratorUnavailable);
    }

    info!("📨 [CODE_CHALLENGE]: Challenge dispatched to [{}].", params.target);

    // 2. ESPERA ACOTADA: vence el primero entre el TTL del código y el
    // deadline global de la corrida.
    let code_expiry = Utc::now() + Duration::minutes(context.tuning.code_ttl_minutes);
    let hard_deadline = code_expiry.min(context.deadline);
    let mut remaining_attempts = context.tuning.code_attempts;

    loop {
        let wait_budget = (hard_deadline - Utc::now()).to_std().unwrap_or_default();

        tokio::select! {
            incoming = signals.recv() => match incoming {
                Some(ProtocolSignal::CodeEntered { code: candidate, reply }) => {
                    if sealed.matches(&candidate) {
                        respond(reply, SignalAck::Accepted);
                        info!("✅ [CODE_CHALLENGE]: Challenge solved for [{}].", params.target);
                        return ProtocolOutcome::Completed {
                            evidence_ref: params.target.clone(),
                            data: serde_json::json!({ "target": params.target }),
                        };
                    }

                    remaining_attempts = remaining_attempts.saturating_sub(1);
                    respond(reply, SignalAck::Rejected(SignalRejection::CodeMismatch {
                        remaining_attempts,
                    }));

                    if remaining_attempts == 0 {
                        warn!("💀 [CODE_CHALLENGE]: Attempts exhausted for [{}].", params.target);
                        return ProtocolOutcome::Failed(FailureReason::Exhausted);
                    }
                }
                Some(ProtocolSignal::Cancel) => return ProtocolOutcome::Cancelled,
                Some(other) => reject_unawaited(other),
                // El buzón colapsó: el orquestador abandona la corrida.
                None => return ProtocolOutcome::Cancelled,
            },
            _ = tokio::time::sleep(wait_budget) => {
                warn!("⏳ [CODE_CHALLENGE]: Challenge expired for [{}].", params.target);
                return ProtocolOutcome::Failed(FailureReason::Expired);
            }
        }
    }
}

/// Rechaza señales ajenas al desafío sin alterar la máquina de estados.
fn reject_unawaited(signal: ProtocolSignal) {
    match signal {
        ProtocolSignal::VerifierConfirmation { reply, .. }
        | ProtocolSignal::Attestation { reply, .. } => {
            respond(reply, SignalAck::Rejected(SignalRejection::NotAwaiting));
        }
        _ => {}
    }
}
