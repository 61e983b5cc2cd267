// [libs/domain/protocols/src/two_party.rs]
/*!
 * =================================================================
 * APARATO: TWO-PARTY IN-PERSON SAGA (V6.0 - COMPENSATION HARDENED)
 * CLASIFICACIÓN: DOMAIN STATE MACHINE (ESTRATO L2)
 * RESPONSABILIDAD: SAGA PRESENCIAL DE DOS VERIFICADORES CON TOKENS QR
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. STRICT FORWARD ORDER: Emisión de tokens → recolección → validación
 *    → registro → otorgamiento; jamás se adelanta un paso.
 * 2. REVERSE COMPENSATION: Ante cualquier quiebre, los pasos completados
 *    se compensan en orden inverso, cada uno con reintento acotado.
 * 3. DERIVABLE INTENT: La intención de compensación es derivable del
 *    estado observable (tokens vigentes + eventos 'verifier_confirmed'
 *    sin 'method_completed' terminal); la recuperación es determinista.
 * 4. DISTINCT VERIFIERS: Dos confirmaciones del mismo verificador
 *    colapsan en una sola; la saga sigue esperando la segunda parte.
 *
 * Estados: Pending → QRIssued → AwaitingFirst → AwaitingSecond →
 * Validating → Recording → Awarding → Completed; rama lateral:
 * cualquier estado de avance + fallo → Compensating → Failed/Cancelled.
 * =================================================================
 */

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use veritas_domain_models::{EventDraft, EventKind, FailureReason};
use veritas_domain_policy::authorize;

use crate::backoff::retry_with_backoff;
use crate::contract::{
    respond, ProtocolContext, ProtocolOutcome, ProtocolSignal, SignalAck, SignalRejection,
};
use crate::ports::TokenBinding;

/// Confirmación recolectada de un verificador.
#[derive(Debug, Clone)]
struct CollectedConfirmation {
    verifier_id: Uuid,
    verifier_slot: u8,
    evidence: serde_json::Value,
}

/// Quiebre de la saga previo a la compensación.
enum SagaBreak {
    Failed(FailureReason),
    Cancelled,
}

/// Ejecuta la saga presencial hasta su desenlace terminal.
#[instrument(skip(context, signals), fields(subject = %context.subject_id, run = %context.protocol_run_id))]
pub async fn execute(
    context: ProtocolContext,
    mut signals: mpsc::Receiver<ProtocolSignal>,
) -> ProtocolOutcome {
    let mut issued_tokens: Vec<String> = Vec::new();
    let mut confirmations: Vec<CollectedConfirmation> = Vec::new();
    let mut recorded: Vec<CollectedConfirmation> = Vec::new();

    // --- PASO 1: EMISIÓN DE TOKENS QR (o rehidratación de la corrida) ---
    let surviving_tokens = context
        .collaborators
        .token_store
        .tokens_for_run(context.protocol_run_id)
        .await
        .unwrap_or_default();

    if surviving_tokens.len() == 2 {
        // Rehidratación: la corrida ya emitió su par; se reutiliza y las
        // ranuras consumidas se reconstruyen como confirmaciones.
        for (token_hex, binding) in surviving_tokens {
            if let Some(consumer) = binding.consumed_by {
                if !confirmations.iter().any(|known| known.verifier_id == consumer) {
                    confirmations.push(CollectedConfirmation {
                        verifier_id: consumer,
                        verifier_slot: binding.verifier_slot,
                        evidence: json!({ "recovered": true }),
                    });
                }
            }
            issued_tokens.push(token_hex);
        }
        info!(
            "♻️ [TWO_PARTY]: Run rehydrated with {} prior confirmations.",
            confirmations.len()
        );
    } else {
        let token_expiry = Utc::now() + Duration::hours(context.tuning.token_ttl_hours);
        for verifier_slot in [1u8, 2u8] {
            let token_hex = forge_token();
            let binding = TokenBinding {
                subject_id: context.subject_id,
                protocol_run_id: context.protocol_run_id,
                verifier_slot,
                expires_at: token_expiry,
                invalidated: false,
                consumed_by: None,
            };

            let stored = retry_with_backoff(context.tuning.side_effect_retry, "token_issue", || {
                context.collaborators.token_store.put_if_absent(&token_hex, binding.clone())
            })
            .await;

            match stored {
                Ok(true) => issued_tokens.push(token_hex),
                // Colisión de 256 bits o fallo físico: ambos abortan la emisión.
                Ok(false) | Err(_) => {
                    return compensate_and_close(
                        &context,
                        &issued_tokens,
                        &confirmations,
                        &recorded,
                        SagaBreak::Failed(FailureReason::CollaboratorUnavailable),
                    )
                    .await;
                }
            }
        }
        info!("🎫 [TWO_PARTY]: QR token pair issued, expiry {}.", token_expiry);
    }

    // --- PASO 2: RECOLECCIÓN DE CONFIRMACIONES (ranuras distintas) ---
    if confirmations.len() < 2 {
        let collection_verdict = collect_confirmations(
            &context,
            &mut signals,
            &issued_tokens,
            &mut confirmations,
        )
        .await;

        if let Err(broke) = collection_verdict {
            return compensate_and_close(&context, &issued_tokens, &confirmations, &recorded, broke)
                .await;
        }
    }

    // --- PASO 3: VALIDACIÓN DE POLÍTICA (ambos verificadores) ---
    for confirmation in &confirmations {
        let verdict = validate_confirmation(&context, confirmation).await;
        if let Err(reason) = verdict {
            warn!(
                "⛔ [TWO_PARTY]: Verifier [{}] denied at validation: {:?}.",
                confirmation.verifier_id, reason
            );
            return compensate_and_close(
                &context,
                &issued_tokens,
                &confirmations,
                &recorded,
                SagaBreak::Failed(FailureReason::UnauthorizedVerifier {
                    verifier_id: confirmation.verifier_id,
                }),
            )
            .await;
        }
    }

    // --- PASO 4: REGISTRO ACÍDICO (eventos + contadores) ---
    for confirmation in &confirmations {
        let sealing = record_confirmation(&context, confirmation).await;
        if sealing.is_err() {
            return compensate_and_close(
                &context,
                &issued_tokens,
                &confirmations,
                &recorded,
                SagaBreak::Failed(FailureReason::CollaboratorUnavailable),
            )
            .await;
        }
        recorded.push(confirmation.clone());
    }

    // --- PASO 5: OTORGAMIENTO ---
    let verifier_ids: Vec<Uuid> = confirmations.iter().map(|c| c.verifier_id).collect();
    info!("🏅 [TWO_PARTY]: Saga completed with verifiers {:?}.", verifier_ids);

    ProtocolOutcome::Completed {
        evidence_ref: format!("{}+{}", verifier_ids[0], verifier_ids[1]),
        data: json!({ "verifier_ids": verifier_ids }),
    }
}

/// Forja un token opaco de 256 bits criptográficamente independiente.
fn forge_token() -> String {
    let mut raw = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut raw);
    hex::encode(raw)
}

/// Bucle de recolección: acepta confirmaciones hasta reunir dos
/// verificadores distintos o vencer el deadline global.
async fn collect_confirmations(
    context: &ProtocolContext,
    signals: &mut mpsc::Receiver<ProtocolSignal>,
    issued_tokens: &[String],
    confirmations: &mut Vec<CollectedConfirmation>,
) -> Result<(), SagaBreak> {
    loop {
        let wait_budget = (context.deadline - Utc::now()).to_std().unwrap_or_default();

        tokio::select! {
            incoming = signals.recv() => match incoming {
                Some(ProtocolSignal::VerifierConfirmation { token_hex, verifier_id, evidence, reply }) => {
                    let ack = absorb_confirmation(
                        context,
                        issued_tokens,
                        confirmations,
                        &token_hex,
                        verifier_id,
                        evidence,
                        Utc::now(),
                    )
                    .await;
                    respond(reply, ack);

                    if confirmations.len() == 2 {
                        return Ok(());
                    }
                }
                Some(ProtocolSignal::Cancel) => return Err(SagaBreak::Cancelled),
                Some(other) => reject_unawaited(other),
                None => return Err(SagaBreak::Cancelled),
            },
            _ = tokio::time::sleep(wait_budget) => {
                warn!("⏳ [TWO_PARTY]: Global deadline elapsed while collecting confirmations.");
                return Err(SagaBreak::Failed(FailureReason::Timeout));
            }
        }
    }
}

/// Absorbe una confirmación individual aplicando las reglas de ranura.
///
/// # Logic:
/// 1. Token desconocido, ajeno a la corrida o invalidado → 'TokenUnknown'.
/// 2. Token vencido → 'TokenExpired'.
/// 3. Token ya consumido por el mismo verificador → idempotente (éxito).
/// 4. Mismo verificador en la otra ranura → colapsa a una confirmación.
async fn absorb_confirmation(
    context: &ProtocolContext,
    issued_tokens: &[String],
    confirmations: &mut Vec<CollectedConfirmation>,
    token_hex: &str,
    verifier_id: Uuid,
    evidence: serde_json::Value,
    now: DateTime<Utc>,
) -> SignalAck {
    if !issued_tokens.iter().any(|issued| issued == token_hex) {
        return SignalAck::Rejected(SignalRejection::TokenUnknown);
    }

    let binding = match context.collaborators.token_store.resolve(token_hex).await {
        Ok(Some(binding)) => binding,
        Ok(None) => return SignalAck::Rejected(SignalRejection::TokenUnknown),
        Err(resolve_fault) => {
            warn!("⚠️ [TWO_PARTY]: Token resolution faulted: {}.", resolve_fault);
            return SignalAck::Rejected(SignalRejection::TokenUnknown);
        }
    };

    if binding.invalidated
        || binding.protocol_run_id != context.protocol_run_id
        || binding.subject_id != context.subject_id
    {
        return SignalAck::Rejected(SignalRejection::TokenUnknown);
    }

    if now > binding.expires_at {
        return SignalAck::Rejected(SignalRejection::TokenExpired);
    }

    match binding.consumed_by {
        // Reenvío idéntico del mismo verificador: idempotente.
        Some(consumer) if consumer == verifier_id => return SignalAck::Accepted,
        // El token pertenece a otro verificador: se trata como desconocido.
        Some(_) => return SignalAck::Rejected(SignalRejection::TokenUnknown),
        None => {}
    }

    match context.collaborators.token_store.consume(token_hex, verifier_id).await {
        Ok(true) => {}
        Ok(false) => return SignalAck::Rejected(SignalRejection::TokenUnknown),
        Err(consume_fault) => {
            warn!("⚠️ [TWO_PARTY]: Token consumption faulted: {}.", consume_fault);
            return SignalAck::Rejected(SignalRejection::TokenUnknown);
        }
    }

    // Mismo verificador en ambas ranuras: colapsa a una sola confirmación.
    if confirmations.iter().any(|known| known.verifier_id == verifier_id) {
        info!(
            "👥 [TWO_PARTY]: Verifier [{}] re-confirmed through a second slot; collapsed.",
            verifier_id
        );
        return SignalAck::Accepted;
    }

    confirmations.push(CollectedConfirmation {
        verifier_id,
        verifier_slot: binding.verifier_slot,
        evidence,
    });
    info!(
        "🤝 [TWO_PARTY]: Confirmation {}/2 absorbed from verifier [{}].",
        confirmations.len(),
        verifier_id
    );

    SignalAck::Accepted
}

/// Valida una confirmación contra la política de autorización.
async fn validate_confirmation(
    context: &ProtocolContext,
    confirmation: &CollectedConfirmation,
) -> Result<(), SignalRejection> {
    let directory = &context.collaborators.verifier_directory;

    let record = match directory.fetch_verifier(confirmation.verifier_id).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            return Err(SignalRejection::VerifierDenied(
                veritas_domain_models::DenialReason::NotAVerifier,
            ))
        }
        Err(_) => {
            return Err(SignalRejection::VerifierDenied(
                veritas_domain_models::DenialReason::NotAVerifier,
            ))
        }
    };

    let snapshot = match directory.fetch_snapshot(confirmation.verifier_id).await {
        Ok(snapshot) => snapshot,
        Err(_) => {
            return Err(SignalRejection::VerifierDenied(
                veritas_domain_models::DenialReason::NotAVerifier,
            ))
        }
    };

    authorize(&record, &snapshot, context.method, Utc::now())
        .map(|_| ())
        .map_err(SignalRejection::VerifierDenied)
}

/// Paso 4: sella 'verifier_confirmed' en el journal del sujeto objetivo
/// e incrementa el contador del verificador.
async fn record_confirmation(
    context: &ProtocolContext,
    confirmation: &CollectedConfirmation,
) -> Result<(), ()> {
    let draft = EventDraft::bare(EventKind::VerifierConfirmed, Some(context.method))
        .with_actor(confirmation.verifier_id)
        .with_run(context.protocol_run_id)
        .with_data(json!({
            "verifier_slot": confirmation.verifier_slot,
            "evidence": confirmation.evidence,
        }));

    retry_with_backoff(context.tuning.side_effect_retry, "confirmation_seal", || {
        context.collaborators.journal.append(context.subject_id, draft.clone())
    })
    .await
    .map_err(|_| ())?;

    retry_with_backoff(context.tuning.side_effect_retry, "confirmation_counter", || {
        context
            .collaborators
            .verifier_directory
            .increment_confirmations(confirmation.verifier_id)
    })
    .await
    .map_err(|_| ())?;

    Ok(())
}

/// Compensación en orden inverso de los pasos completados, con reintento
/// acotado por paso. El agotamiento degrada el desenlace a
/// 'Failed(CompensationIncomplete)' para atención del operador.
///
/// # Logic (orden inverso):
/// 1. Confirmaciones selladas (paso 4): evento de reversa + decremento
///    del contador + aviso al verificador.
/// 2. Confirmaciones recolectadas sin sellar (paso 2): evento de reversa
///    y aviso; el contador jamás se movió, no se toca.
/// 3. Tokens emitidos (paso 1): invalidación en el almacén.
async fn compensate_and_close(
    context: &ProtocolContext,
    issued_tokens: &[String],
    collected: &[CollectedConfirmation],
    recorded: &[CollectedConfirmation],
    broke: SagaBreak,
) -> ProtocolOutcome {
    let mut compensation_clean = true;

    for confirmation in collected.iter().rev() {
        let was_recorded = recorded
            .iter()
            .any(|sealed| sealed.verifier_id == confirmation.verifier_id);

        if revoke_confirmation(context, confirmation, was_recorded).await.is_err() {
            compensation_clean = false;
        }
    }

    for token_hex in issued_tokens.iter().rev() {
        let invalidation = retry_with_backoff(
            context.tuning.compensation_retry,
            "token_invalidate",
            || context.collaborators.token_store.invalidate(token_hex),
        )
        .await;

        if invalidation.is_err() {
            compensation_clean = false;
        }
    }

    if !compensation_clean {
        error!(
            "🚨 [TWO_PARTY_STUCK]: Compensation incomplete for run [{}]; operator attention required.",
            context.protocol_run_id
        );
        return ProtocolOutcome::Failed(FailureReason::CompensationIncomplete);
    }

    match broke {
        SagaBreak::Failed(reason) => ProtocolOutcome::Failed(reason),
        SagaBreak::Cancelled => ProtocolOutcome::Cancelled,
    }
}

/// Reversa de una confirmación: evento 'verifier_confirmation_revoked',
/// decremento del contador solo si el sellado del paso 4 ocurrió, y
/// aviso al verificador afectado.
async fn revoke_confirmation(
    context: &ProtocolContext,
    confirmation: &CollectedConfirmation,
    was_recorded: bool,
) -> Result<(), ()> {
    let draft = EventDraft::bare(EventKind::VerifierConfirmationRevoked, Some(context.method))
        .with_actor(confirmation.verifier_id)
        .with_run(context.protocol_run_id)
        .with_data(json!({ "verifier_slot": confirmation.verifier_slot }));

    retry_with_backoff(context.tuning.compensation_retry, "confirmation_revoke", || {
        context.collaborators.journal.append(context.subject_id, draft.clone())
    })
    .await
    .map_err(|_| ())?;

    if was_recorded {
        retry_with_backoff(context.tuning.compensation_retry, "counter_decrement", || {
            context
                .collaborators
                .verifier_directory
                .decrement_confirmations(confirmation.verifier_id)
        })
        .await
        .map_err(|_| ())?;
    }

    retry_with_backoff(context.tuning.compensation_retry, "verifier_notice", || {
        context.collaborators.notifications.deliver(
            confirmation.verifier_id,
            "verifier_confirmation_revoked",
            json!({
                "subject_id": context.subject_id,
                "protocol_run_id": context.protocol_run_id,
            }),
        )
    })
    .await
    .map_err(|_| ())?;

    Ok(())
}

/// Rechaza señales ajenas a la saga sin alterar la máquina de estados.
fn reject_unawaited(signal: ProtocolSignal) {
    match signal {
        ProtocolSignal::CodeEntered { reply, .. }
        | ProtocolSignal::Attestation { reply, .. } => {
            respond(reply, SignalAck::Rejected(SignalRejection::NotAwaiting));
        }
        _ => {}
    }
}
