// [libs/domain/models-rs/src/verifier.rs]
/*!
 * =================================================================
 * APARATO: VERIFIER DOMAIN MODELS (V3.0 - CREDENTIAL GOVERNANCE)
 * CLASIFICACIÓN: DOMAIN ENTITIES (L2)
 * RESPONSABILIDAD: REGISTRO DE VERIFICADORES Y SUS CREDENCIALES
 * =================================================================
 */

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;
use uuid::Uuid;

/// Umbral de confirmaciones exitosas que otorga la credencial sintética
/// 'TrustedVerifier' de forma automática.
pub const TRUSTED_VERIFIER_THRESHOLD: u32 = 50;

/// Credenciales reconocidas por la política de autorización de verificadores.
#[typeshare]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    NotaryPublic,
    Attorney,
    CommunityLeader,
    VerifiedBusinessOwner,
    OrganizationDirector,
    GovernmentOfficial,
    /// Sintética: se considera poseída automáticamente al superar el
    /// umbral de confirmaciones exitosas. Nunca se persiste.
    TrustedVerifier,
}

impl CredentialKind {
    pub fn as_label(&self) -> &'static str {
        match self {
            CredentialKind::NotaryPublic => "notary_public",
            CredentialKind::Attorney => "attorney",
            CredentialKind::CommunityLeader => "community_leader",
            CredentialKind::VerifiedBusinessOwner => "verified_business_owner",
            CredentialKind::OrganizationDirector => "organization_director",
            CredentialKind::GovernmentOfficial => "government_official",
            CredentialKind::TrustedVerifier => "trusted_verifier",
        }
    }
}

/// Registro de un sujeto habilitado para verificar a terceros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifierRecord {
    pub subject_id: Uuid,
    pub credentials: BTreeSet<CredentialKind>,
    pub authorized: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revocation_reason: Option<String>,
    pub successful_confirmations: u32,
}

impl VerifierRecord {
    /// Decide si el registro porta una credencial, resolviendo la
    /// credencial sintética 'TrustedVerifier' por conteo.
    pub fn holds(&self, credential: CredentialKind) -> bool {
        if credential == CredentialKind::TrustedVerifier {
            return self.successful_confirmations >= TRUSTED_VERIFIER_THRESHOLD
                || self.credentials.contains(&CredentialKind::TrustedVerifier);
        }
        self.credentials.contains(&credential)
    }

    /// Decide si el registro porta al menos una del conjunto dado.
    pub fn holds_any(&self, credentials: &[CredentialKind]) -> bool {
        credentials.iter().any(|credential| self.holds(*credential))
    }
}
