// [tests/mirror/apps/orchestrator/crash_recovery.test.rs]
/**
 * =================================================================
 * APARATO: CRASH RECOVERY TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L1-MIRROR
 * RESPONSABILIDAD: LEY R1 — REHIDRATACIÓN POST-CRASH DESDE EL LEDGER
 *
 * Un segundo proceso del motor sobre el MISMO Ledger debe proyectar
 * exactamente el estado pre-crash, incluyendo la ruta con marcador de
 * checkpoint y la auditoría de divergencia.
 * =================================================================
 */

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use uuid::Uuid;
use veritas_domain_models::{EventKind, StartMethodPayload, SubjectClass, VerificationMethod};
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

/// Forja un proceso del motor sobre el Ledger compartido dado.
async fn forge_grounds(db_label: &str, checkpoint_interval: u64) -> ProvingGrounds {
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
    settings.checkpoint_interval_events = checkpoint_interval;
    settings.tuning.side_effect_retry = RetryPolicy::immediate(3);
    settings.tuning.compensation_retry = RetryPolicy::immediate(3);

    let state = EngineState::new(client, collaborators, settings);
    let gateway = Arc::new(VerificationGateway::new(state.clone()));

    ProvingGrounds { state, gateway, code_delivery }
}

async fn complete_email(grounds: &ProvingGrounds, subject: Uuid, target: &str) {
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

    // Espera del sellado terminal.
    for _ in 0..200 {
        if grounds.gateway.query_score(subject).await.expect("Consulta") == 30 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("La compleción del email jamás se selló");
}

#[tokio::test]
async fn certify_rehydration_matches_pre_crash_state() {
    println!("\n🔄 [PROVING_GROUNDS]: Certifying R1 (crash recovery)...");

    // 1. PROCESO ORIGINAL: email completo con checkpoint agresivo.
    let original = forge_grounds("veritas_e2e_recovery", 2).await;
    let subject = Uuid::new_v4();
    complete_email(&original, subject, "recovery@veritas.io").await;

    // El intervalo agresivo debe haber sellado un marcador (y superado
    // la auditoría de divergencia del re-pliegue).
    let mut marker = None;
    for _ in 0..200 {
        marker = original.state.checkpoints.fetch(subject).await.expect("Lectura del marcador");
        if marker.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let marker = marker.expect("El marcador de checkpoint debe existir");
    assert!(marker.last_seq >= 2);

    let sealed = original.state.journal.read_journal(subject, 0).await.expect("Lectura");
    assert!(sealed.iter().any(|event| event.kind == EventKind::SnapshotRebuilt));

    let pre_crash_score = original.gateway.query_score(subject).await.expect("Consulta");
    let pre_crash_level = original.gateway.query_level(subject).await.expect("Consulta");

    // 2. "CRASH": un proceso nuevo del motor sobre el MISMO Ledger.
    // (El ancla de memoria del proceso original mantiene vivo el strata.)
    let resurrected = forge_grounds("veritas_e2e_recovery", 1000).await;

    let recovered_score = resurrected.gateway.query_score(subject).await.expect("Consulta");
    let recovered_level = resurrected.gateway.query_level(subject).await.expect("Consulta");

    assert_eq!(recovered_score, pre_crash_score, "R1: el puntaje debe sobrevivir al crash");
    assert_eq!(recovered_level, pre_crash_level, "R1: el nivel debe sobrevivir al crash");

    let recovered_counts =
        resurrected.gateway.query_completed(subject).await.expect("Consulta de conteos");
    assert_eq!(recovered_counts.get(&VerificationMethod::Email), Some(&1));

    println!("   ✅ [SUCCESS]: Post-crash projection levelized at {} points.", recovered_score);
}

/**
 * REHIDRATACIÓN DE CORRIDAS VIVAS: un desafío sin desenlace terminal
 * se re-arma tras el reinicio y sigue aceptando señales.
 */
#[tokio::test]
async fn certify_live_run_rearming_after_restart() {
    let original = forge_grounds("veritas_e2e_recovery_live", 1000).await;
    let subject = Uuid::new_v4();

    original
        .gateway
        .start_method(StartMethodPayload {
            subject_id: subject,
            subject_class: SubjectClass::Individual,
            method: VerificationMethod::Email,
            params: json!({ "target": "live@veritas.io" }),
            command_id: Uuid::new_v4(),
        })
        .await
        .expect("Ignición del desafío");

    for _ in 0..200 {
        if original.code_delivery.dispatch_count() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // Reinicio sin desenlace terminal: la corrida sigue viva en el journal.
    let resurrected = forge_grounds("veritas_e2e_recovery_live", 1000).await;

    let status = resurrected
        .gateway
        .query_method_status(subject, VerificationMethod::Email)
        .await
        .expect("Consulta de estado");

    assert_eq!(status.completed_count, 0);
    assert!(status.active_state.is_some(), "La corrida debe re-armarse tras el reinicio");

    // El desafío re-armado despacha un código nuevo en el proceso fresco
    // y acepta su resolución end-to-end.
    let mut code = None;
    for _ in 0..200 {
        code = resurrected.code_delivery.last_code_for("live@veritas.io");
        if code.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let solved = resurrected
        .gateway
        .enter_code(subject, VerificationMethod::Email, code.expect("Código re-armado"))
        .await
        .expect("Ingreso del código");
    assert!(solved);

    for _ in 0..200 {
        if resurrected.gateway.query_score(subject).await.expect("Consulta") == 30 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(resurrected.gateway.query_score(subject).await.expect("Consulta"), 30);
}
