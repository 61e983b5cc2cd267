// [libs/domain/scoring/src/catalog.rs]
/*!
 * =================================================================
 * APARATO: METHOD POLICY CATALOG (V3.4 - AUTHORITATIVE TABLE)
 * CLASIFICACIÓN: DOMAIN CONFIGURATION (ESTRATO L2)
 * RESPONSABILIDAD: TABLA ESTÁTICA DE POLÍTICAS POR MÉTODO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SINGLE SOURCE OF TRUTH: Los valores de esta tabla son autoritativos
 *    para todo el motor; ningún estrato superior porta constantes propias.
 * 2. CLOSED COVERAGE: La tabla cubre la enumeración cerrada completa de
 *    métodos; la cobertura total está certificada por el Proving Grounds.
 * =================================================================
 */

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use veritas_domain_models::{SubjectClass, VerificationMethod};

/// Conjunto de clases de sujeto a las que un método aplica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applicability {
    pub individual: bool,
    pub business: bool,
    pub organization: bool,
}

impl Applicability {
    pub const ALL: Applicability =
        Applicability { individual: true, business: true, organization: true };
    pub const INDIVIDUAL: Applicability =
        Applicability { individual: true, business: false, organization: false };
    pub const BUSINESS: Applicability =
        Applicability { individual: false, business: true, organization: false };
    pub const ORGANIZATION: Applicability =
        Applicability { individual: false, business: false, organization: true };
    pub const BUSINESS_AND_ORG: Applicability =
        Applicability { individual: false, business: true, organization: true };

    pub fn covers(&self, class: SubjectClass) -> bool {
        match class {
            SubjectClass::Individual => self.individual,
            SubjectClass::Business => self.business,
            SubjectClass::Organization => self.organization,
        }
    }
}

/// Banda estática de esfuerzo estimado, usada por el ranking de rutas
/// sugeridas. El orden ascendente de las variantes ES el orden de esfuerzo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EffortBand {
    Automatic,
    CodeChallenge,
    Attestation,
    DocumentReview,
    InPerson,
}

impl EffortBand {
    pub fn rank(&self) -> u8 {
        match self {
            EffortBand::Automatic => 0,
            EffortBand::CodeChallenge => 1,
            EffortBand::Attestation => 2,
            EffortBand::DocumentReview => 3,
            EffortBand::InPerson => 4,
        }
    }
}

/// Familia de protocolo hijo que ejecuta el método. Tabla de despacho
/// estática: sin jerarquías de tipos ni despacho dinámico por clase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolFamily {
    /// Desafío de código de 6 dígitos entregado fuera de banda.
    CodeChallenge,
    /// Saga presencial de dos verificadores con tokens QR y compensación.
    TwoPartySaga,
    /// Espera de adjudicación humana sobre un documento.
    HumanReview,
    /// Ingesta de atestación o referencia de un tercero autorizado.
    Attestation,
    /// Registro directo de telemetría de plataforma; completa al inicio.
    PlatformRecord,
}

/// Política estática de un método de verificación.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodPolicy {
    pub base_points: i64,
    /// Cuántas compleciones distintas cuentan para el puntaje (≥ 1).
    pub max_multiplier: u32,
    /// Días de vigencia de una compleción; 0 = sin expiración.
    pub decay_days: i64,
    pub requires_human_review: bool,
    pub applicable: Applicability,
    pub effort: EffortBand,
    pub family: ProtocolFamily,
}

/// Tabla autoritativa método → política. Cobertura total de la enumeración.
static CATALOG: Lazy<BTreeMap<VerificationMethod, MethodPolicy>> = Lazy::new(|| {
    use EffortBand as E;
    use ProtocolFamily as F;
    use VerificationMethod as M;

    let rows: [(M, MethodPolicy); 23] = [
        (M::Email, MethodPolicy {
            base_points: 30, max_multiplier: 1, decay_days: 365,
            requires_human_review: false, applicable: Applicability::ALL,
            effort: E::CodeChallenge, family: F::CodeChallenge,
        }),
        (M::Phone, MethodPolicy {
            base_points: 30, max_multiplier: 1, decay_days: 365,
            requires_human_review: false, applicable: Applicability::ALL,
            effort: E::CodeChallenge, family: F::CodeChallenge,
        }),
        (M::TwoPartyInPerson, MethodPolicy {
            base_points: 150, max_multiplier: 1, decay_days: 0,
            requires_human_review: false, applicable: Applicability::INDIVIDUAL,
            effort: E::InPerson, family: F::TwoPartySaga,
        }),
        (M::GovernmentId, MethodPolicy {
            base_points: 100, max_multiplier: 1, decay_days: 0,
            requires_human_review: true, applicable: Applicability::INDIVIDUAL,
            effort: E::DocumentReview, family: F::HumanReview,
        }),
        (M::Biometric, MethodPolicy {
            base_points: 80, max_multiplier: 1, decay_days: 0,
            requires_human_review: true, applicable: Applicability::INDIVIDUAL,
            effort: E::InPerson, family: F::HumanReview,
        }),
        (M::PersonalReference, MethodPolicy {
            base_points: 50, max_multiplier: 3, decay_days: 0,
            requires_human_review: false, applicable: Applicability::INDIVIDUAL,
            effort: E::Attestation, family: F::Attestation,
        }),
        (M::CommunityAttestation, MethodPolicy {
            base_points: 40, max_multiplier: 2, decay_days: 0,
            requires_human_review: false, applicable: Applicability::INDIVIDUAL,
            effort: E::Attestation, family: F::Attestation,
        }),
        (M::PlatformHistory, MethodPolicy {
            base_points: 20, max_multiplier: 1, decay_days: 365,
            requires_human_review: false, applicable: Applicability::ALL,
            effort: E::Automatic, family: F::PlatformRecord,
        }),
        (M::TransactionHistory, MethodPolicy {
            base_points: 30, max_multiplier: 1, decay_days: 365,
            requires_human_review: false, applicable: Applicability::ALL,
            effort: E::Automatic, family: F::PlatformRecord,
        }),
        (M::BusinessLicense, MethodPolicy {
            base_points: 120, max_multiplier: 1, decay_days: 0,
            requires_human_review: true, applicable: Applicability::BUSINESS,
            effort: E::DocumentReview, family: F::HumanReview,
        }),
        (M::TaxId, MethodPolicy {
            base_points: 120, max_multiplier: 1, decay_days: 0,
            requires_human_review: true, applicable: Applicability::BUSINESS_AND_ORG,
            effort: E::DocumentReview, family: F::HumanReview,
        }),
        (M::BusinessAddress, MethodPolicy {
            base_points: 60, max_multiplier: 1, decay_days: 365,
            requires_human_review: true, applicable: Applicability::BUSINESS,
            effort: E::DocumentReview, family: F::HumanReview,
        }),
        (M::OwnerVerification, MethodPolicy {
            base_points: 100, max_multiplier: 1, decay_days: 0,
            requires_human_review: false, applicable: Applicability::BUSINESS,
            effort: E::InPerson, family: F::Attestation,
        }),
        (M::BusinessInsurance, MethodPolicy {
            base_points: 60, max_multiplier: 1, decay_days: 365,
            requires_human_review: true, applicable: Applicability::BUSINESS,
            effort: E::DocumentReview, family: F::HumanReview,
        }),
        (M::ProfessionalLicense, MethodPolicy {
            base_points: 80, max_multiplier: 2, decay_days: 365,
            requires_human_review: true, applicable: Applicability::BUSINESS,
            effort: E::DocumentReview, family: F::HumanReview,
        }),
        (M::BusinessReference, MethodPolicy {
            base_points: 40, max_multiplier: 3, decay_days: 0,
            requires_human_review: false, applicable: Applicability::BUSINESS,
            effort: E::Attestation, family: F::Attestation,
        }),
        (M::CommunityEndorsement, MethodPolicy {
            base_points: 40, max_multiplier: 2, decay_days: 0,
            requires_human_review: false, applicable: Applicability::BUSINESS,
            effort: E::Attestation, family: F::Attestation,
        }),
        (M::NonprofitStatus, MethodPolicy {
            base_points: 120, max_multiplier: 1, decay_days: 0,
            requires_human_review: true, applicable: Applicability::ORGANIZATION,
            effort: E::DocumentReview, family: F::HumanReview,
        }),
        (M::OrgBylaws, MethodPolicy {
            base_points: 60, max_multiplier: 1, decay_days: 0,
            requires_human_review: true, applicable: Applicability::ORGANIZATION,
            effort: E::DocumentReview, family: F::HumanReview,
        }),
        (M::BoardVerification, MethodPolicy {
            base_points: 100, max_multiplier: 1, decay_days: 0,
            requires_human_review: false, applicable: Applicability::ORGANIZATION,
            effort: E::InPerson, family: F::Attestation,
        }),
        (M::MissionAlignment, MethodPolicy {
            base_points: 40, max_multiplier: 1, decay_days: 365,
            requires_human_review: true, applicable: Applicability::ORGANIZATION,
            effort: E::DocumentReview, family: F::HumanReview,
        }),
        (M::OrgReference, MethodPolicy {
            base_points: 40, max_multiplier: 3, decay_days: 0,
            requires_human_review: false, applicable: Applicability::ORGANIZATION,
            effort: E::Attestation, family: F::Attestation,
        }),
        (M::NotaryVerification, MethodPolicy {
            base_points: 100, max_multiplier: 1, decay_days: 0,
            requires_human_review: false, applicable: Applicability::INDIVIDUAL,
            effort: E::InPerson, family: F::Attestation,
        }),
    ];

    rows.into_iter().collect()
});

/// Resuelve la política de un método del catálogo cerrado.
///
/// # Invariante:
/// La tabla cubre la enumeración completa; la cobertura está certificada
/// en el Proving Grounds de esta crate.
pub fn policy(method: VerificationMethod) -> &'static MethodPolicy {
    CATALOG
        .get(&method)
        .expect("CATALOG_INTEGRITY: closed enumeration coverage violated")
}
