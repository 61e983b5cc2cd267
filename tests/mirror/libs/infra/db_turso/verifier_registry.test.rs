// [tests/mirror/libs/infra/db_turso/verifier_registry.test.rs]
/**
 * =================================================================
 * APARATO: VERIFIER REGISTRY TEST (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE GOBERNANZA DE VERIFICADORES
 * =================================================================
 */

use std::collections::BTreeSet;

use uuid::Uuid;
use veritas_domain_models::CredentialKind;
use veritas_infra_db::{DbError, JournalRepository, TursoClient, VerifierRepository};

async fn forge_registry(db_label: &str) -> VerifierRepository {
    let url = format!("file:{}?mode=memory&cache=shared", db_label);
    let client = TursoClient::connect(&url, None).await.expect("Enlace táctico en memoria");
    let journal = JournalRepository::new(client.clone());
    VerifierRepository::new(client, journal)
}

/**
 * ALTA Y RECUPERACIÓN: las credenciales sobreviven el roundtrip JSON.
 */
#[tokio::test]
async fn certify_registration_roundtrip() {
    println!("\n🛡️ [PROVING_GROUNDS]: Auditing verifier governance strata...");

    let registry = forge_registry("veritas_verifiers_reg").await;
    let verifier = Uuid::new_v4();

    let credentials: BTreeSet<CredentialKind> =
        [CredentialKind::NotaryPublic, CredentialKind::CommunityLeader]
            .into_iter()
            .collect();

    registry.register_verifier(verifier, &credentials).await.expect("Alta del verificador");

    let record = registry
        .fetch(verifier)
        .await
        .expect("Lectura del directorio")
        .expect("Registro presente");

    assert_eq!(record.credentials, credentials);
    assert!(record.authorized);
    assert!(record.revoked_at.is_none());
    assert_eq!(record.successful_confirmations, 0);

    // Un fantasma no existe en el directorio.
    assert!(registry.fetch(Uuid::new_v4()).await.expect("Lectura fantasma").is_none());

    println!("   ✅ [SUCCESS]: Registration strata levelized.");
}

/**
 * OTORGAMIENTO: una credencial adicional se suma sin perder las previas.
 */
#[tokio::test]
async fn certify_credential_grant() {
    let registry = forge_registry("veritas_verifiers_grant").await;
    let verifier = Uuid::new_v4();

    registry
        .register_verifier(verifier, &[CredentialKind::Attorney].into_iter().collect())
        .await
        .expect("Alta del verificador");

    registry
        .grant_credential(verifier, CredentialKind::GovernmentOfficial)
        .await
        .expect("Otorgamiento");

    let record = registry.fetch(verifier).await.expect("Lectura").expect("Registro");
    assert!(record.credentials.contains(&CredentialKind::Attorney));
    assert!(record.credentials.contains(&CredentialKind::GovernmentOfficial));

    // Otorgar a un fantasma es un fallo semántico.
    let ghost_verdict = registry
        .grant_credential(Uuid::new_v4(), CredentialKind::Attorney)
        .await;
    assert!(matches!(ghost_verdict, Err(DbError::VerifierNotFound)));
}

/**
 * CONTADORES ATÓMICOS: incremento, decremento y saturación en cero.
 */
#[tokio::test]
async fn certify_confirmation_counters() {
    let registry = forge_registry("veritas_verifiers_counters").await;
    let verifier = Uuid::new_v4();

    registry
        .register_verifier(verifier, &BTreeSet::new())
        .await
        .expect("Alta del verificador");

    registry.increment_confirmations(verifier).await.expect("Incremento 1");
    registry.increment_confirmations(verifier).await.expect("Incremento 2");

    let record = registry.fetch(verifier).await.expect("Lectura").expect("Registro");
    assert_eq!(record.successful_confirmations, 2);

    registry.decrement_confirmations(verifier).await.expect("Decremento 1");
    registry.decrement_confirmations(verifier).await.expect("Decremento 2");
    // Saturación: jamás por debajo de cero.
    registry.decrement_confirmations(verifier).await.expect("Decremento saturado");

    let drained = registry.fetch(verifier).await.expect("Lectura").expect("Registro");
    assert_eq!(drained.successful_confirmations, 0);
}

/**
 * REVOCACIÓN Y RE-ALTA: la revocación sella el registro; el re-alta
 * restituye la autoridad preservando el contador histórico.
 */
#[tokio::test]
async fn certify_revocation_and_reinstatement() {
    let registry = forge_registry("veritas_verifiers_revoke").await;
    let verifier = Uuid::new_v4();

    registry
        .register_verifier(verifier, &[CredentialKind::NotaryPublic].into_iter().collect())
        .await
        .expect("Alta del verificador");
    registry.increment_confirmations(verifier).await.expect("Incremento");

    registry
        .revoke_verifier(verifier, "credential lapsed")
        .await
        .expect("Revocación");

    let revoked = registry.fetch(verifier).await.expect("Lectura").expect("Registro");
    assert!(!revoked.authorized);
    assert!(revoked.revoked_at.is_some());
    assert_eq!(revoked.revocation_reason.as_deref(), Some("credential lapsed"));

    // Re-alta por upsert: autoridad restituida, contador intacto.
    registry
        .register_verifier(verifier, &[CredentialKind::NotaryPublic].into_iter().collect())
        .await
        .expect("Re-alta");

    let reinstated = registry.fetch(verifier).await.expect("Lectura").expect("Registro");
    assert!(reinstated.authorized);
    assert!(reinstated.revoked_at.is_none());
    assert_eq!(reinstated.successful_confirmations, 1);
}
