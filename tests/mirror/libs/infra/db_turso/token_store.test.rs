// [tests/mirror/libs/infra/db_turso/token_store.test.rs]
/**
 * =================================================================
 * APARATO: QR TOKEN STORE TEST (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DEL CAS DE TOKENS DE LA SAGA
 * =================================================================
 */

use chrono::{Duration, Utc};
use uuid::Uuid;
use veritas_domain_protocols::TokenBinding;
use veritas_infra_db::{TokenRepository, TursoClient};

async fn forge_store(db_label: &str) -> TokenRepository {
    let url = format!("file:{}?mode=memory&cache=shared", db_label);
    let client = TursoClient::connect(&url, None).await.expect("Enlace táctico en memoria");
    TokenRepository::new(client)
}

fn forge_binding(run_id: Uuid, slot: u8, ttl_hours: i64) -> TokenBinding {
    TokenBinding {
        subject_id: Uuid::new_v4(),
        protocol_run_id: run_id,
        verifier_slot: slot,
        expires_at: Utc::now() + Duration::hours(ttl_hours),
        invalidated: false,
        consumed_by: None,
    }
}

/**
 * PUT-IF-ABSENT: la segunda escritura del mismo token pierde.
 */
#[tokio::test]
async fn certify_put_if_absent_semantics() {
    println!("\n🎫 [PROVING_GROUNDS]: Auditing token CAS strata...");

    let store = forge_store("veritas_tokens_pia").await;
    let run = Uuid::new_v4();

    let first = store
        .put_if_absent("aa11", &forge_binding(run, 1, 72))
        .await
        .expect("Primera escritura");
    assert!(first);

    let duplicate = store
        .put_if_absent("aa11", &forge_binding(run, 2, 72))
        .await
        .expect("Escritura duplicada");
    assert!(!duplicate, "La colisión de token debe perder el put-if-absent");

    let resolved = store.resolve("aa11").await.expect("Resolución").expect("Token presente");
    assert_eq!(resolved.verifier_slot, 1, "La vinculación original debe sobrevivir");

    println!("   ✅ [SUCCESS]: Put-if-absent levelized.");
}

/**
 * CONSUMO CAS: un token pertenece a exactamente un verificador; el
 * reintento del mismo consumidor es idempotente.
 */
#[tokio::test]
async fn certify_consume_cas_and_idempotence() {
    let store = forge_store("veritas_tokens_cas").await;
    let run = Uuid::new_v4();
    let first_verifier = Uuid::new_v4();
    let second_verifier = Uuid::new_v4();

    store
        .put_if_absent("bb22", &forge_binding(run, 1, 72))
        .await
        .expect("Escritura del token");

    assert!(store.consume("bb22", first_verifier).await.expect("Primer consumo"));
    // Idempotencia del mismo consumidor (Ley B3 a nivel de almacén).
    assert!(store.consume("bb22", first_verifier).await.expect("Reintento idempotente"));
    // El segundo verificador pierde el CAS.
    assert!(!store.consume("bb22", second_verifier).await.expect("CAS perdido"));

    let resolved = store.resolve("bb22").await.expect("Resolución").expect("Token presente");
    assert_eq!(resolved.consumed_by, Some(first_verifier));
}

/**
 * INVALIDACIÓN: la compensación mata el token para todo uso posterior.
 */
#[tokio::test]
async fn certify_invalidation() {
    let store = forge_store("veritas_tokens_void").await;
    let run = Uuid::new_v4();

    store
        .put_if_absent("cc33", &forge_binding(run, 1, 72))
        .await
        .expect("Escritura del token");
    store
        .put_if_absent("dd44", &forge_binding(run, 2, 72))
        .await
        .expect("Escritura del segundo token");

    store.invalidate("cc33").await.expect("Invalidación");

    let resolved = store.resolve("cc33").await.expect("Resolución").expect("Token presente");
    assert!(resolved.invalidated);
    assert!(!store.consume("cc33", Uuid::new_v4()).await.expect("Consumo vetado"));

    // El inventario de la corrida excluye los tokens invalidados.
    let survivors = store.tokens_for_run(run).await.expect("Inventario de corrida");
    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].0, "dd44");

    // La invalidación de un fantasma es inocua (compensación idempotente).
    store.invalidate("no_such_token").await.expect("Invalidación fantasma");
}

/**
 * REAPER: la purga retira únicamente los tokens físicamente vencidos.
 */
#[tokio::test]
async fn certify_expired_token_pruning() {
    let store = forge_store("veritas_tokens_reaper").await;
    let run = Uuid::new_v4();

    // Un token vencido (TTL negativo) y uno vigente.
    store
        .put_if_absent("ee55", &forge_binding(run, 1, -1))
        .await
        .expect("Token vencido");
    store
        .put_if_absent("ff66", &forge_binding(run, 2, 72))
        .await
        .expect("Token vigente");

    let pruned = store.prune_expired().await.expect("Purga del reaper");
    assert_eq!(pruned, 1);

    assert!(store.resolve("ee55").await.expect("Resolución").is_none());
    assert!(store.resolve("ff66").await.expect("Resolución").is_some());
}
