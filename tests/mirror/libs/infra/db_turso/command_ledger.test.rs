// [tests/mirror/libs/infra/db_turso/command_ledger.test.rs]
/**
 * =================================================================
 * APARATO: COMMAND LEDGER TEST (V2.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DEL ESCUDO DE IDEMPOTENCIA (P7)
 * =================================================================
 */

use serde_json::json;
use uuid::Uuid;
use veritas_infra_db::{CommandLedgerRepository, TursoClient};

async fn forge_ledger(db_label: &str) -> CommandLedgerRepository {
    let url = format!("file:{}?mode=memory&cache=shared", db_label);
    let client = TursoClient::connect(&url, None).await.expect("Enlace táctico en memoria");
    CommandLedgerRepository::new(client)
}

/**
 * LEY P7: un mando se sella exactamente una vez; la repetición
 * recupera el desenlace original bit-perfecto.
 */
#[tokio::test]
async fn certify_single_seal_and_recall() {
    println!("\n🔁 [PROVING_GROUNDS]: Auditing replay shield strata...");

    let ledger = forge_ledger("veritas_commands_seal").await;
    let subject = Uuid::new_v4();
    let command = Uuid::new_v4();
    let outcome = json!({ "protocol_run_id": Uuid::new_v4() });

    // 1. SELLADO ORIGINAL
    assert!(ledger.seal(subject, command, &outcome).await.expect("Primer sellado"));

    // 2. REPETICIÓN: el segundo sellado pierde, el desenlace sobrevive.
    let replay_outcome = json!({ "protocol_run_id": Uuid::new_v4() });
    assert!(!ledger.seal(subject, command, &replay_outcome).await.expect("Sellado repetido"));

    let recalled = ledger
        .recall(subject, command)
        .await
        .expect("Recuperación")
        .expect("Desenlace sellado presente");
    assert_eq!(recalled, outcome, "El desenlace original debe sobrevivir al replay");

    println!("   ✅ [SUCCESS]: Replay shield levelized.");
}

/**
 * AISLAMIENTO: el mismo 'command_id' bajo sujetos distintos no colisiona.
 */
#[tokio::test]
async fn certify_per_subject_command_scope() {
    let ledger = forge_ledger("veritas_commands_scope").await;
    let command = Uuid::new_v4();
    let alpha = Uuid::new_v4();
    let beta = Uuid::new_v4();

    assert!(ledger.seal(alpha, command, &json!({ "who": "alpha" })).await.expect("Sellado alpha"));
    assert!(ledger.seal(beta, command, &json!({ "who": "beta" })).await.expect("Sellado beta"));

    let alpha_outcome = ledger.recall(alpha, command).await.expect("Recall").expect("Presente");
    assert_eq!(alpha_outcome["who"], "alpha");

    // Un mando jamás visto retorna vacío.
    assert!(ledger.recall(alpha, Uuid::new_v4()).await.expect("Recall fantasma").is_none());
}
