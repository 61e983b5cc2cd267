// [tests/mirror/apps/orchestrator/business_ascent.test.rs]
/**
 * =================================================================
 * APARATO: BUSINESS ASCENT TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L1-MIRROR
 * RESPONSABILIDAD: ESCENARIO SEMILLA 3 — LICENCIA + EMAIL (NEGOCIO)
 *
 * Una licencia comercial aprobada por revisión humana (120) más un
 * email verificado (30) elevan al negocio a 150 puntos con exactamente
 * UNA transición de nivel (Unverified → Minimal).
 * =================================================================
 */

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use uuid::Uuid;
use veritas_domain_models::{
    EventKind, StartMethodPayload, SubjectClass, VerificationLevel, VerificationMethod,
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
    review_queue: Arc<RecordingReviewQueue>,
    notifier: Arc<RecordingNotifier>,
}

async fn forge_grounds(db_label: &str) -> ProvingGrounds {
    let url = format!("file:{}?mode=memory&cache=shared", db_label);
    let client = TursoClient::connect(&url, None).await.expect("Enlace táctico en memoria");

    let journal = JournalRepository::new(client.clone());
    let verifiers = VerifierRepository::new(client.clone(), journal.clone());
    let tokens = TokenRepository::new(client.clone());
    let code_delivery = Arc::new(RecordingCodeDelivery::default());
    let review_queue = Arc::new(RecordingReviewQueue::default());
    let notifier = Arc::new(RecordingNotifier::default());

    let collaborators = Collaborators {
        code_delivery: code_delivery.clone(),
        review_queue: review_queue.clone(),
        token_store: Arc::new(tokens),
        verifier_directory: Arc::new(verifiers),
        journal: Arc::new(journal),
        notifications: notifier.clone(),
    };

    let mut settings = EngineSettings::nominal();
    settings.tuning.side_effect_retry = RetryPolicy::immediate(3);
    settings.tuning.compensation_retry = RetryPolicy::immediate(3);

    let state = EngineState::new(client, collaborators, settings);
    let gateway = Arc::new(VerificationGateway::new(state.clone()));

    ProvingGrounds { state, gateway, code_delivery, review_queue, notifier }
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
async fn certify_business_license_plus_email() {
    println!("\n🏢 [PROVING_GROUNDS]: Scenario 3 — business license + email...");

    let grounds = forge_grounds("veritas_e2e_business").await;
    let business = Uuid::new_v4();

    // 1. LICENCIA COMERCIAL: revisión humana aprobada → 120 puntos.
    grounds
        .gateway
        .start_method(StartMethodPayload {
            subject_id: business,
            subject_class: SubjectClass::Business,
            method: VerificationMethod::BusinessLicense,
            params: json!({ "document_ref": "blob://license-2026-0042" }),
            command_id: Uuid::new_v4(),
        })
        .await
        .expect("Ignición de la revisión");

    // La tarea debe encolarse en el colaborador externo.
    for _ in 0..200 {
        if !grounds.review_queue.enqueued.lock().expect("Ledger de revisión").is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    {
        let enqueued = grounds.review_queue.enqueued.lock().expect("Ledger de revisión");
        assert_eq!(enqueued.len(), 1);
        assert_eq!(enqueued[0].method, VerificationMethod::BusinessLicense);
    }

    grounds
        .gateway
        .review_decision(business, VerificationMethod::BusinessLicense, true, None)
        .await
        .expect("Veredicto del revisor");

    assert_eq!(poll_score(&grounds.gateway, business, 120).await, 120);
    assert_eq!(
        grounds.gateway.query_level(business).await.expect("Consulta de nivel"),
        VerificationLevel::Minimal
    );

    // 2. EMAIL: desafío de código → 150 puntos.
    grounds
        .gateway
        .start_method(StartMethodPayload {
            subject_id: business,
            subject_class: SubjectClass::Business,
            method: VerificationMethod::Email,
            params: json!({ "target": "ops@negocio.mx" }),
            command_id: Uuid::new_v4(),
        })
        .await
        .expect("Ignición del desafío");

    let mut code = None;
    for _ in 0..200 {
        code = grounds.code_delivery.last_code_for("ops@negocio.mx");
        if code.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let solved = grounds
        .gateway
        .enter_code(business, VerificationMethod::Email, code.expect("Código despachado"))
        .await
        .expect("Ingreso del código");
    assert!(solved);

    assert_eq!(poll_score(&grounds.gateway, business, 150).await, 150);

    // 3. VALIDATION: exactamente UNA transición de nivel en el rastro.
    let sealed = grounds
        .state
        .journal
        .read_journal(business, 0)
        .await
        .expect("Lectura del journal");

    let level_shifts: Vec<_> = sealed
        .iter()
        .filter(|event| event.kind == EventKind::LevelChanged)
        .collect();
    assert_eq!(level_shifts.len(), 1, "La licencia cruza el umbral; el email no re-cruza");
    assert_eq!(level_shifts[0].data["old_level"], "unverified");
    assert_eq!(level_shifts[0].data["new_level"], "minimal");

    // La transición despachó su intento de notificación.
    for _ in 0..200 {
        if grounds.notifier.count_of_kind("level_changed") == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(grounds.notifier.count_of_kind("level_changed"), 1);

    println!("   ✅ [SUCCESS]: Business ascent levelized with a single level shift.");
}
