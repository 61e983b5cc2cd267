// [tests/mirror/apps/orchestrator/decay_threshold.test.rs]
/**
 * =================================================================
 * APARATO: DECAY THRESHOLD TEST (V4.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L1-MIRROR
 * RESPONSABILIDAD: ESCENARIO SEMILLA 4 — EXPIRACIÓN Y DESCENSO
 *
 * El Ledger se siembra con compleciones retro-datadas (366 días): el
 * temporizador durable de decaimiento dispara en la rehidratación y
 * el nivel desciende solo cuando el puntaje cruza el umbral.
 * =================================================================
 */

use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use uuid::Uuid;
use veritas_domain_models::{EventKind, VerificationLevel, VerificationMethod};
use veritas_domain_protocols::fakes::{
    RecordingCodeDelivery, RecordingNotifier, RecordingReviewQueue,
};
use veritas_domain_protocols::{Collaborators, RetryPolicy};
use veritas_infra_db::{JournalRepository, TokenRepository, TursoClient, VerifierRepository};
use veritas_orchestrator::prelude::*;

struct ProvingGrounds {
    state: EngineState,
    gateway: Arc<VerificationGateway>,
    notifier: Arc<RecordingNotifier>,
}

async fn forge_grounds(db_label: &str) -> ProvingGrounds {
    let url = format!("file:{}?mode=memory&cache=shared", db_label);
    let client = TursoClient::connect(&url, None).await.expect("Enlace táctico en memoria");

    let journal = JournalRepository::new(client.clone());
    let verifiers = VerifierRepository::new(client.clone(), journal.clone());
    let tokens = TokenRepository::new(client.clone());
    let notifier = Arc::new(RecordingNotifier::default());

    let collaborators = Collaborators {
        code_delivery: Arc::new(RecordingCodeDelivery::default()),
        review_queue: Arc::new(RecordingReviewQueue::default()),
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

    ProvingGrounds { state, gateway, notifier }
}

/// Siembra una compleción retro-datada directamente en el Ledger.
async fn seed_backdated_completion(
    state: &EngineState,
    subject: Uuid,
    seq: u64,
    method: VerificationMethod,
    age_days: i64,
) {
    let connection = state.database_client.get_connection().expect("Enlace del Ledger");
    let at = (Utc::now() - chrono::Duration::days(age_days))
        .to_rfc3339_opts(SecondsFormat::Micros, true);

    connection
        .execute(
            "INSERT INTO verification_journal
                (subject_id, seq, at, kind, method, actor_subject_id, protocol_run_id, data)
             VALUES (?1, ?2, ?3, 'method_completed', ?4, NULL, NULL, '{\"evidence_ref\":\"seed\"}')",
            libsql::params![subject.to_string(), seq as i64, at, method.as_label()],
        )
        .await
        .expect("Siembra retro-datada");
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

/**
 * CASO A: 180 → 150 tras expirar el email; el nivel NO desciende.
 */
#[tokio::test]
async fn certify_expiry_without_level_descent() {
    println!("\n⌛ [PROVING_GROUNDS]: Scenario 4A — decay without descent...");

    let grounds = forge_grounds("veritas_e2e_decay_a").await;
    let subject = Uuid::new_v4();

    // Email de hace 366 días (vencido) + saga vigente (sin decaimiento).
    seed_backdated_completion(&grounds.state, subject, 1, VerificationMethod::Email, 366).await;
    seed_backdated_completion(&grounds.state, subject, 2, VerificationMethod::TwoPartyInPerson, 1)
        .await;

    // La rehidratación dispara el temporizador vencido: 180 → 150.
    assert_eq!(poll_score(&grounds.gateway, subject, 150).await, 150);
    assert_eq!(
        grounds.gateway.query_level(subject).await.expect("Consulta de nivel"),
        VerificationLevel::Minimal
    );

    let sealed = grounds.state.journal.read_journal(subject, 0).await.expect("Lectura del journal");
    assert!(sealed.iter().any(|event| event.kind == EventKind::MethodExpired));
    assert!(
        !sealed.iter().any(|event| event.kind == EventKind::LevelChanged),
        "150 sigue sobre el umbral Minimal: sin transición"
    );

    println!("   ✅ [SUCCESS]: Decay absorbed without level descent.");
}

/**
 * CASO B: 110 → 80 tras expirar el email; desciende Minimal → Unverified
 * con exactamente una transición y su intento de notificación.
 */
#[tokio::test]
async fn certify_expiry_crossing_threshold_down() {
    println!("\n⌛ [PROVING_GROUNDS]: Scenario 4B — decay crossing threshold down...");

    let grounds = forge_grounds("veritas_e2e_decay_b").await;
    let subject = Uuid::new_v4();

    // Email vencido (30) + biometría vigente (80): 110 → 80.
    seed_backdated_completion(&grounds.state, subject, 1, VerificationMethod::Email, 366).await;
    seed_backdated_completion(&grounds.state, subject, 2, VerificationMethod::Biometric, 1).await;

    assert_eq!(poll_score(&grounds.gateway, subject, 80).await, 80);
    assert_eq!(
        grounds.gateway.query_level(subject).await.expect("Consulta de nivel"),
        VerificationLevel::Unverified
    );

    let sealed = grounds.state.journal.read_journal(subject, 0).await.expect("Lectura del journal");
    let descents: Vec<_> = sealed
        .iter()
        .filter(|event| event.kind == EventKind::LevelChanged)
        .collect();
    assert_eq!(descents.len(), 1);
    assert_eq!(descents[0].data["old_level"], "minimal");
    assert_eq!(descents[0].data["new_level"], "unverified");

    for _ in 0..200 {
        if grounds.notifier.count_of_kind("level_changed") == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(grounds.notifier.count_of_kind("level_changed"), 1);

    println!("   ✅ [SUCCESS]: Downward level shift sealed and notified.");
}
