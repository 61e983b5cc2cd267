// [tests/mirror/apps/orchestrator/revocation_governance.test.rs]
/**
 * =================================================================
 * APARATO: REVOCATION GOVERNANCE TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L1-MIRROR
 * RESPONSABILIDAD: LEY R2 — REVOCAR Y RECOMPLETAR + GOBERNANZA DE ACTOR
 * =================================================================
 */

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use uuid::Uuid;
use veritas_domain_models::{
    CommandRejection, EventKind, RevokePayload, StartMethodPayload, SubjectClass,
    VerificationLevel, VerificationMethod,
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

async fn complete_email(grounds: &ProvingGrounds, subject: Uuid, target: &str, expected_score: i64) {
    grounds
        .gateway
        .start_method(StartMethodPayload {
            subject_id: subject,
            subject_class: SubjectClass::Individual,
            method: VerificationMethod::Email,
            params: json!({ "target": target }),
            command_id: Uuid::new_v4(),
        })
        .await
        .expect("Ignición del desafío");

    let mut code = None;
    for _ in 0..200 {
        code = grounds.code_delivery.last_code_for(target);
        if code.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let solved = grounds
        .gateway
        .enter_code(subject, VerificationMethod::Email, code.expect("Código despachado"))
        .await
        .expect("Ingreso del código");
    assert!(solved);

    for _ in 0..200 {
        if grounds.gateway.query_score(subject).await.expect("Consulta") == expected_score {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("El puntaje jamás alcanzó {}", expected_score);
}

#[tokio::test]
async fn certify_revoke_then_recomplete_restores_score() {
    println!("\n🗑️ [PROVING_GROUNDS]: Certifying R2 (revoke-then-recomplete)...");

    let grounds = forge_grounds("veritas_e2e_revoke").await;
    let subject = Uuid::new_v4();

    // 1. COMPLECIÓN ORIGINAL: 30 puntos.
    complete_email(&grounds, subject, "first@veritas.io", 30).await;

    // 2. GOBERNANZA: un extraño sin registro no puede revocar.
    let stranger_verdict = grounds
        .gateway
        .revoke(RevokePayload {
            subject_id: subject,
            method: VerificationMethod::Email,
            reason: "malicious".into(),
            actor_id: Uuid::new_v4(),
            command_id: Uuid::new_v4(),
        })
        .await;
    assert!(matches!(stranger_verdict, Err(CommandRejection::ActorNotAuthorized)));

    // 3. REVOCACIÓN LEGÍTIMA: el propio sujeto sella la reversa.
    let new_level = grounds
        .gateway
        .revoke(RevokePayload {
            subject_id: subject,
            method: VerificationMethod::Email,
            reason: "mailbox compromised".into(),
            actor_id: subject,
            command_id: Uuid::new_v4(),
        })
        .await
        .expect("Revocación del sujeto");

    assert_eq!(new_level, VerificationLevel::Unverified);
    assert_eq!(grounds.gateway.query_score(subject).await.expect("Consulta"), 0);

    let sealed = grounds.state.journal.read_journal(subject, 0).await.expect("Lectura");
    assert!(sealed.iter().any(|event| event.kind == EventKind::MethodRevoked));

    // 4. LEY R2: recompletar restituye exactamente el puntaje original.
    complete_email(&grounds, subject, "second@veritas.io", 30).await;

    let counts = grounds.gateway.query_completed(subject).await.expect("Consulta de conteos");
    assert_eq!(counts.get(&VerificationMethod::Email), Some(&1), "El multiplicador no se excede");

    println!("   ✅ [SUCCESS]: R2 certified — score restored to 30.");
}

/**
 * PRECONDICIÓN: revocar un método sin compleciones ni corrida activa
 * es un rechazo síncrono sin rastro en el journal.
 */
#[tokio::test]
async fn certify_nothing_to_revoke_rejection() {
    let grounds = forge_grounds("veritas_e2e_revoke_empty").await;
    let subject = Uuid::new_v4();

    let verdict = grounds
        .gateway
        .revoke(RevokePayload {
            subject_id: subject,
            method: VerificationMethod::Phone,
            reason: "noop".into(),
            actor_id: subject,
            command_id: Uuid::new_v4(),
        })
        .await;

    assert!(matches!(verdict, Err(CommandRejection::NothingToRevoke)));

    // Ningún rechazo escribe en el Ledger.
    let sealed = grounds.state.journal.read_journal(subject, 0).await.expect("Lectura");
    assert!(sealed.is_empty());
}

/**
 * LÁPIDA: tras 'DeleteSubject' el stream queda sellado ante mandos.
 */
#[tokio::test]
async fn certify_tombstone_seals_commands() {
    let grounds = forge_grounds("veritas_e2e_tombstone").await;
    let subject = Uuid::new_v4();

    complete_email(&grounds, subject, "doomed@veritas.io", 30).await;

    grounds
        .gateway
        .delete_subject(veritas_domain_models::DeleteSubjectPayload {
            subject_id: subject,
            actor_id: subject,
            command_id: Uuid::new_v4(),
        })
        .await
        .expect("Lápida del sujeto");

    let verdict = grounds
        .gateway
        .start_method(StartMethodPayload {
            subject_id: subject,
            subject_class: SubjectClass::Individual,
            method: VerificationMethod::Phone,
            params: json!({ "target": "+15550123" }),
            command_id: Uuid::new_v4(),
        })
        .await;

    assert!(matches!(verdict, Err(CommandRejection::SubjectTombstoned)));

    // Las consultas siguen sirviendo el último estado comprometido.
    assert_eq!(grounds.gateway.query_score(subject).await.expect("Consulta"), 30);
}
