// [tests/mirror/apps/orchestrator/baseline_individual.test.rs]
/**
 * =================================================================
 * APARATO: BASELINE INDIVIDUAL TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L1-MIRROR
 * RESPONSABILIDAD: ESCENARIO SEMILLA 1 — SAGA PRESENCIAL COMPLETA
 *
 * Un individuo sin canales digitales asciende a Minimal mediante la
 * saga presencial: dos verificadores (notario + líder comunitario en
 * Standard) confirman sus ranuras QR.
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
}

async fn forge_grounds(db_label: &str) -> ProvingGrounds {
    let url = format!("file:{}?mode=memory&cache=shared", db_label);
    let client = TursoClient::connect(&url, None).await.expect("Enlace táctico en memoria");

    let journal = JournalRepository::new(client.clone());
    let verifiers = VerifierRepository::new(client.clone(), journal.clone());
    let tokens = TokenRepository::new(client.clone());

    let collaborators = Collaborators {
        code_delivery: Arc::new(RecordingCodeDelivery::default()),
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

    ProvingGrounds { state, gateway }
}

/// Asciende a un sujeto hasta Standard sellando compleciones semilla.
async fn ascend_to_standard(state: &EngineState, subject: Uuid) {
    for method in [VerificationMethod::TwoPartyInPerson, VerificationMethod::GovernmentId] {
        state
            .journal
            .append(
                subject,
                &EventDraft::bare(EventKind::MethodCompleted, Some(method))
                    .with_data(json!({ "evidence_ref": "seed" })),
                None,
            )
            .await
            .expect("Siembra de compleción");
    }
}

async fn await_token_pair(gateway: &VerificationGateway, run_id: Uuid) -> Vec<String> {
    for _ in 0..200 {
        let pair = gateway.query_run_tokens(run_id).await.expect("Consulta de tokens");
        if pair.len() == 2 {
            return pair;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("La saga no emitió su par de tokens a tiempo");
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

#[tokio::test]
async fn certify_homeless_individual_baseline() {
    println!("\n🏛️ [PROVING_GROUNDS]: Scenario 1 — homeless-individual baseline...");

    let grounds = forge_grounds("veritas_e2e_baseline").await;
    let subject = Uuid::new_v4();

    // 1. SETUP: notario + líder comunitario en Standard
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
    ascend_to_standard(&grounds.state, leader).await;

    // 2. EXECUTION: ignición de la saga + confirmaciones de ambas ranuras
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

    let pair = await_token_pair(&grounds.gateway, receipt.protocol_run_id).await;

    for (token, verifier) in [(pair[0].clone(), notary), (pair[1].clone(), leader)] {
        let accepted = grounds
            .gateway
            .verifier_confirm(VerifierConfirmPayload {
                token,
                verifier_id: verifier,
                evidence: json!({ "site": "community-center" }),
                command_id: Uuid::new_v4(),
            })
            .await
            .expect("Confirmación del verificador");
        assert!(accepted);
    }

    // 3. VALIDATION: puntaje, nivel, conteos y contadores de verificadores
    assert_eq!(poll_score(&grounds.gateway, subject, 150).await, 150);
    assert_eq!(
        grounds.gateway.query_level(subject).await.expect("Consulta de nivel"),
        VerificationLevel::Minimal
    );

    let completed = grounds.gateway.query_completed(subject).await.expect("Consulta de conteos");
    assert_eq!(completed.get(&VerificationMethod::TwoPartyInPerson), Some(&1));

    for verifier in [notary, leader] {
        let record = grounds
            .state
            .verifiers
            .fetch(verifier)
            .await
            .expect("Lectura del directorio")
            .expect("Registro del verificador");
        assert_eq!(record.successful_confirmations, 1, "El contador debe moverse exactamente una vez");
    }

    println!("   ✅ [SUCCESS]: Baseline levelized at Minimal with 150 points.");
}
