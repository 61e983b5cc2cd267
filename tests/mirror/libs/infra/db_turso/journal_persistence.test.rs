// [tests/mirror/libs/infra/db_turso/journal_persistence.test.rs]
/**
 * =================================================================
 * APARATO: JOURNAL PERSISTENCE TEST (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DEL LEDGER (P3 / READ-YOUR-WRITE)
 * =================================================================
 */

use serde_json::json;
use uuid::Uuid;
use veritas_domain_models::{EventDraft, EventKind, VerificationLevel, VerificationMethod};
use veritas_infra_db::{DbError, JournalRepository, TursoClient};

async fn forge_journal(db_label: &str) -> JournalRepository {
    let url = format!("file:{}?mode=memory&cache=shared", db_label);
    let client = TursoClient::connect(&url, None).await.expect("Enlace táctico en memoria");
    JournalRepository::new(client)
}

fn completed_draft(method: VerificationMethod) -> EventDraft {
    EventDraft::bare(EventKind::MethodCompleted, Some(method))
        .with_data(json!({ "evidence_ref": "seed" }))
}

/**
 * LEY P3: las secuencias selladas forman un prefijo de ℕ sin huecos.
 */
#[tokio::test]
async fn certify_gap_free_sequencing() {
    println!("\n📚 [PROVING_GROUNDS]: Auditing gap-free journal strata...");

    let journal = forge_journal("veritas_journal_p3").await;
    let subject = Uuid::new_v4();

    for expected_seq in 1..=5u64 {
        let sealed = journal
            .append(subject, &completed_draft(VerificationMethod::Email), None)
            .await
            .expect("Anexo auto-secuenciado");
        assert_eq!(sealed, expected_seq);
    }

    let events = journal.read_journal(subject, 0).await.expect("Lectura del stream");
    let sequences: Vec<u64> = events.iter().map(|event| event.seq).collect();
    assert_eq!(sequences, vec![1, 2, 3, 4, 5]);

    println!("   ✅ [SUCCESS]: Five events sealed with zero gaps.");
}

/**
 * CONCURRENCIA OPTIMISTA: la expectativa obsoleta pierde la carrera
 * con 'SequenceConflict' y el Ledger queda intacto.
 */
#[tokio::test]
async fn certify_optimistic_conflict() {
    let journal = forge_journal("veritas_journal_cas").await;
    let subject = Uuid::new_v4();

    journal
        .append(subject, &completed_draft(VerificationMethod::Email), Some(0))
        .await
        .expect("Primer anexo con expectativa fresca");
    journal
        .append(subject, &completed_draft(VerificationMethod::Phone), Some(1))
        .await
        .expect("Segundo anexo con expectativa fresca");

    // Expectativa obsoleta: la cola real es 2, no 1.
    let stale_verdict = journal
        .append(subject, &completed_draft(VerificationMethod::Email), Some(1))
        .await;

    assert!(
        matches!(stale_verdict, Err(DbError::SequenceConflict { expected_last_seq: 1 })),
        "La expectativa obsoleta debe perder la carrera"
    );

    assert_eq!(journal.last_seq(subject).await.expect("Cola del stream"), 2);
}

/**
 * READ-YOUR-WRITE: la proyección posterior al anexo refleja el evento.
 */
#[tokio::test]
async fn certify_read_your_write_projection() {
    let journal = forge_journal("veritas_journal_ryw").await;
    let subject = Uuid::new_v4();

    let virgin = journal.snapshot(subject).await.expect("Proyección virgen");
    assert_eq!(virgin.score, 0);
    assert_eq!(virgin.level, VerificationLevel::Unverified);

    journal
        .append(subject, &completed_draft(VerificationMethod::Email), None)
        .await
        .expect("Anexo de compleción");

    let refreshed = journal.snapshot(subject).await.expect("Proyección refrescada");
    assert_eq!(refreshed.score, 30);
    assert_eq!(refreshed.last_seq, 1);

    // La invalidación explícita fuerza el re-pliegue sin alterar el resultado.
    journal.invalidate(subject);
    let refolded = journal.snapshot(subject).await.expect("Re-pliegue");
    assert_eq!(refolded, refreshed);
}

/**
 * AISLAMIENTO: los streams de sujetos distintos jamás se contaminan.
 */
#[tokio::test]
async fn certify_per_subject_isolation() {
    let journal = forge_journal("veritas_journal_iso").await;
    let alpha = Uuid::new_v4();
    let beta = Uuid::new_v4();

    journal
        .append(alpha, &completed_draft(VerificationMethod::Email), None)
        .await
        .expect("Anexo alpha");
    journal
        .append(beta, &completed_draft(VerificationMethod::Phone), None)
        .await
        .expect("Anexo beta");

    assert_eq!(journal.last_seq(alpha).await.expect("Cola alpha"), 1);
    assert_eq!(journal.last_seq(beta).await.expect("Cola beta"), 1);

    let alpha_events = journal.read_journal(alpha, 0).await.expect("Stream alpha");
    assert_eq!(alpha_events.len(), 1);
    assert_eq!(alpha_events[0].method, Some(VerificationMethod::Email));

    let inventory = journal.list_subjects().await.expect("Inventario de streams");
    assert!(inventory.contains(&alpha) && inventory.contains(&beta));
}
