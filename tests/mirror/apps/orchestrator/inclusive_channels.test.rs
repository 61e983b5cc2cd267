// [tests/mirror/apps/orchestrator/inclusive_channels.test.rs]
/**
 * =================================================================
 * APARATO: INCLUSIVE CHANNELS TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L1-MIRROR
 * RESPONSABILIDAD: ESCENARIO SEMILLA 2 — CANALES DIGITALES + SAGA
 *
 * Email + Phone suman 60 puntos (aún Unverified); la saga presencial
 * posterior eleva al sujeto a 210 puntos (Minimal).
 * =================================================================
 */

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use uuid::Uuid;
use veritas_domain_models::{
    CredentialKind, EventDraft, EventKind, StartMethodPayload, SubjectClass, VerificationLevel,
    VerificationMethod, VerifierConfirmPayload,
};
use veritas_domain_protocols::fakes::{
    RecordingCodeDelivery, RecordingNotifier, RecordingReviewQueue,
};
use veritas_domain_protocols::{Collaborators, RetryPolicy};
use veritas_infra_db::{JournalRepository, TokenRepository, TursoClient, VerifierRepository};
use veritas_orchestrator::prelude::*;

struct ProvingGrounds {
    state: EngineState,
    gateway: Arc<VerificationGateway>,
    code_delivery: Arc<RecordingCodeDelivery>,
}

async fn forge_grounds(db_label: &str) -> ProvingGrounds {
    let url = format!("file:{}?mode=memory&cache=shared", db_label);
    let client = TursoClient::connect(&url, None).await.expect("Enlace táctico en memoria");

    let journal = JournalRepository::new(client.clone());
    let verifiers = VerifierRepository::new(client.clone(), journal.clone());
    let tokens = TokenRepository::new(client.clone());
    let code_delivery = Arc::new(RecordingCodeDelivery::default());

    let collaborators = Collaborators {
        code_delivery: code_delivery.clone(),
        review_queue: Arc::new(RecordingReviewQueue::default()),
        token_store: Arc::new(tokens),
        verifier_directory: Arc::new(verifiers),
        journal: Arc::new(journal),
        notifications: Arc::new(RecordingNotifier::default()),
    };

    let mut settings = EngineSettings::nominal();
    settings.tuning.side_effect_retry = RetryPolicy::immediate(3);
    settings.tuning.compensation_retry = RetryPolicy::immediate(3);

    let state = EngineState::new(client, collaborators, settings);
    let gateway = Arc::new(VerificationGateway::new(state.clone()));

    ProvingGrounds { state, gateway, code_delivery }
}

async fn await_code(delivery: &RecordingCodeDelivery, target: &str) -> String {
    for _ in 0..200 {
        if let Some(code) = delivery.last_code_for(target) {
            return code;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("El desafío jamás fue despachado hacia [{}]", target);
}

async fn poll_score(gateway: &VerificationGateway, subject: Uuid, expected: i64) -> i64 {
    let mut observed = i64::MIN;
    for _ in 0..200 {
        observed = gateway.query_score(subject).await.expect("Consulta de puntaje");
        if observed == expected {
            return observed;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    observed
}

/// Completa un desafío de código end-to-end a través del gateway.
async fn complete_code_challenge(
    grounds: &ProvingGrounds,
    subject: Uuid,
    method: VerificationMethod,
    target: &str,
) {
    grounds
        .gateway
        .start_method(StartMethodPayload {
            subject_id: subject,
            subject_class: SubjectClass::Individual,
            method,
            params: json!({ "target": target }),
            command_id: Uuid::new_v4(),
        })
        .await
        .expect("Ignición del desafío");

    let code = await_code(&grounds.code_delivery, target).await;
    let solved = grounds
        .gateway
        .enter_code(subject, method, code)
        .await
        .expect("Ingreso del código");
    assert!(solved, "El código exacto debe sellar la compleción");
}

#[tokio::test]
async fn certify_inclusive_channels_then_saga() {
    println!("\n📨 [PROVING_GROUNDS]: Scenario 2 — inclusive channels + saga...");

    let grounds = forge_grounds("veritas_e2e_inclusive").await;
    let subject = Uuid::new_v4();

    // 1. CANALES DIGITALES: Email + Phone = 60 puntos, aún Unverified.
    complete_code_challenge(&grounds, subject, VerificationMethod::Email, "x@y").await;
    assert_eq!(poll_score(&grounds.gateway, subject, 30).await, 30);

    complete_code_challenge(&grounds, subject, VerificationMethod::Phone, "+15550100").await;
    assert_eq!(poll_score(&grounds.gateway, subject, 60).await, 60);
    assert_eq!(
        grounds.gateway.query_level(subject).await.expect("Consulta de nivel"),
        VerificationLevel::Unverified
    );

    // El sugeridor apunta al ascenso pendiente.
    let ascent = grounds.gateway.query_next_level(subject).await.expect("Consulta de ruta");
    assert_eq!(ascent.target_level, VerificationLevel::Minimal);
    assert_eq!(ascent.points_needed, 40);
    assert!(!ascent.suggested_paths.is_empty());

    // 2. SAGA PRESENCIAL: dos verificadores válidos elevan a Minimal.
    let notary = Uuid::new_v4();
    let leader = Uuid::new_v4();
    grounds
        .gateway
        .register_verifier(notary, [CredentialKind::NotaryPublic].into_iter().collect::<BTreeSet<_>>())
        .await
        .expect("Alta del notario");
    grounds
        .gateway
        .register_verifier(leader, [CredentialKind::CommunityLeader].into_iter().collect::<BTreeSet<_>>())
        .await
        .expect("Alta del líder");

    for method in [VerificationMethod::TwoPartyInPerson, VerificationMethod::GovernmentId] {
        grounds
            .state
            .journal
            .append(
                leader,
                &EventDraft::bare(EventKind::MethodCompleted, Some(method))
                    .with_data(json!({ "evidence_ref": "seed" })),
                None,
            )
            .await
            .expect("Siembra del nivel del líder");
    }

    let receipt = grounds
        .gateway
        .start_method(StartMethodPayload {
            subject_id: subject,
            subject_class: SubjectClass::Individual,
            method: VerificationMethod::TwoPartyInPerson,
            params: json!({}),
            command_id: Uuid::new_v4(),
        })
        .await
        .expect("Ignición de la saga");

    let mut pair = Vec::new();
    for _ in 0..200 {
        pair = grounds
            .gateway
            .query_run_tokens(receipt.protocol_run_id)
            .await
            .expect("Consulta de tokens");
        if pair.len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(pair.len(), 2, "La saga debe emitir su par de tokens");

    for (token, verifier) in [(pair[0].clone(), notary), (pair[1].clone(), leader)] {
        let accepted = grounds
            .gateway
            .verifier_confirm(VerifierConfirmPayload {
                token,
                verifier_id: verifier,
                evidence: json!({}),
                command_id: Uuid::new_v4(),
            })
            .await
            .expect("Confirmación del verificador");
        assert!(accepted);
    }

    // 3. VALIDATION: 60 + 150 = 210 → Minimal.
    assert_eq!(poll_score(&grounds.gateway, subject, 210).await, 210);
    assert_eq!(
        grounds.gateway.query_level(subject).await.expect("Consulta de nivel"),
        VerificationLevel::Minimal
    );

    println!("   ✅ [SUCCESS]: Inclusive ascent levelized at 210 points.");
}
