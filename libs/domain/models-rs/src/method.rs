// [libs/domain/models-rs/src/method.rs]
/*!
 * =================================================================
 * APARATO: VERIFICATION METHOD CATALOG (V4.1 - CLOSED ENUMERATION)
 * CLASIFICACIÓN: DOMAIN ENTITIES (L2)
 * RESPONSABILIDAD: ENUMERACIÓN CERRADA DE MÉTODOS Y NIVELES DE CONFIANZA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. NOMINAL ORDER: El orden de declaración de las variantes ES el orden
 *    lexicográfico canónico usado por el desempate determinista del
 *    sugeridor de rutas (Scoring L2).
 * 2. WIRE PARITY: Serialización 'snake_case' bit-perfecta con el Ledger
 *    táctico y el Dashboard TypeScript.
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Enumeración cerrada de métodos de verificación soportados por el motor.
///
/// El orden de declaración es contractual: los desempates deterministas
/// del modelo de puntaje se resuelven por este orden.
#[typeshare]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    Email,
    Phone,
    TwoPartyInPerson,
    GovernmentId,
    Biometric,
    PersonalReference,
    CommunityAttestation,
    PlatformHistory,
    TransactionHistory,
    BusinessLicense,
    TaxId,
    BusinessAddress,
    OwnerVerification,
    BusinessInsurance,
    ProfessionalLicense,
    BusinessReference,
    CommunityEndorsement,
    NonprofitStatus,
    OrgBylaws,
    BoardVerification,
    MissionAlignment,
    OrgReference,
    NotaryVerification,
}

impl VerificationMethod {
    /// Inventario completo del catálogo, en orden canónico.
    pub const ALL: [VerificationMethod; 23] = [
        VerificationMethod::Email,
        VerificationMethod::Phone,
        VerificationMethod::TwoPartyInPerson,
        VerificationMethod::GovernmentId,
        VerificationMethod::Biometric,
        VerificationMethod::PersonalReference,
        VerificationMethod::CommunityAttestation,
        VerificationMethod::PlatformHistory,
        VerificationMethod::TransactionHistory,
        VerificationMethod::BusinessLicense,
        VerificationMethod::TaxId,
        VerificationMethod::BusinessAddress,
        VerificationMethod::OwnerVerification,
        VerificationMethod::BusinessInsurance,
        VerificationMethod::ProfessionalLicense,
        VerificationMethod::BusinessReference,
        VerificationMethod::CommunityEndorsement,
        VerificationMethod::NonprofitStatus,
        VerificationMethod::OrgBylaws,
        VerificationMethod::BoardVerification,
        VerificationMethod::MissionAlignment,
        VerificationMethod::OrgReference,
        VerificationMethod::NotaryVerification,
    ];

    /// Etiqueta nominal estable para el rastro forense y las filas del Ledger.
    pub fn as_label(&self) -> &'static str {
        match self {
            VerificationMethod::Email => "email",
            VerificationMethod::Phone => "phone",
            VerificationMethod::TwoPartyInPerson => "two_party_in_person",
            VerificationMethod::GovernmentId => "government_id",
            VerificationMethod::Biometric => "biometric",
            VerificationMethod::PersonalReference => "personal_reference",
            VerificationMethod::CommunityAttestation => "community_attestation",
            VerificationMethod::PlatformHistory => "platform_history",
            VerificationMethod::TransactionHistory => "transaction_history",
            VerificationMethod::BusinessLicense => "business_license",
            VerificationMethod::TaxId => "tax_id",
            VerificationMethod::BusinessAddress => "business_address",
            VerificationMethod::OwnerVerification => "owner_verification",
            VerificationMethod::BusinessInsurance => "business_insurance",
            VerificationMethod::ProfessionalLicense => "professional_license",
            VerificationMethod::BusinessReference => "business_reference",
            VerificationMethod::CommunityEndorsement => "community_endorsement",
            VerificationMethod::NonprofitStatus => "nonprofit_status",
            VerificationMethod::OrgBylaws => "org_bylaws",
            VerificationMethod::BoardVerification => "board_verification",
            VerificationMethod::MissionAlignment => "mission_alignment",
            VerificationMethod::OrgReference => "org_reference",
            VerificationMethod::NotaryVerification => "notary_verification",
        }
    }

    /// Resuelve un método desde su etiqueta nominal de fila del Ledger.
    pub fn from_label(label: &str) -> Option<Self> {
        VerificationMethod::ALL
            .into_iter()
            .find(|method| method.as_label() == label)
    }
}

/// Banda cualitativa de verificación derivada del puntaje por umbrales fijos.
///
/// El orden de las variantes es el orden natural de los niveles: la
/// derivación `Ord` sostiene las comparaciones de ascenso y descenso.
#[typeshare]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationLevel {
    Unverified,
    Minimal,
    Standard,
    Enhanced,
    Complete,
}

impl VerificationLevel {
    pub fn as_label(&self) -> &'static str {
        match self {
            VerificationLevel::Unverified => "unverified",
            VerificationLevel::Minimal => "minimal",
            VerificationLevel::Standard => "standard",
            VerificationLevel::Enhanced => "enhanced",
            VerificationLevel::Complete => "complete",
        }
    }
}
