// [tests/mirror/libs/domain/models_rs/journal_strata.test.rs]
/**
 * =================================================================
 * APARATO: JOURNAL STRATA TEST (V2.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE ETIQUETAS NOMINALES DEL LEDGER
 * =================================================================
 */

use veritas_domain_models::{CommandRejection, DenialReason, EventKind, VerificationMethod};

#[test]
fn certify_event_kind_label_bijection() {
    println!("\n🧪 [PROVING_GROUNDS]: Auditing event kind label strata...");

    for kind in EventKind::ALL {
        let label = kind.as_label();
        let recovered = EventKind::from_label(label)
            .expect("Toda etiqueta nominal debe resolver a su clase de evento");
        assert_eq!(recovered, kind, "Biyección rota para [{}]", label);
    }

    assert!(EventKind::from_label("ghost_event").is_none());
    println!("   ✅ [SUCCESS]: {} event kinds levelized.", EventKind::ALL.len());
}

#[test]
fn certify_method_label_bijection() {
    for method in VerificationMethod::ALL {
        let recovered = VerificationMethod::from_label(method.as_label())
            .expect("Toda etiqueta nominal debe resolver a su método");
        assert_eq!(recovered, method);
    }

    assert!(VerificationMethod::from_label("carrier_pigeon").is_none());
}

#[test]
fn certify_rejection_rendering_carries_stratum_codes() {
    let denial = CommandRejection::VerifierDenied(DenialReason::BelowMinimumLevel);
    let rendered = denial.to_string();

    assert!(rendered.contains("L2_COMMAND_FAULT"));
    assert!(rendered.contains("VERIFIER_DENIED"));

    assert!(CommandRejection::TokenExpired.to_string().contains("TOKEN_EXPIRED"));
    assert!(CommandRejection::TemporarilyUnavailable
        .to_string()
        .contains("TEMPORARILY_UNAVAILABLE"));
}
