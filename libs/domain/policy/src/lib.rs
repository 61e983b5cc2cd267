// [libs/domain/policy/src/lib.rs]
/*!
 * =================================================================
 * APARATO: VERIFIER AUTHORIZATION POLICY (V3.0 - RULE CHAIN)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: DECISIÓN PURA DE APTITUD DE VERIFICADORES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. FIRST MATCH WINS: Las reglas se evalúan en orden estricto; la
 *    primera denegación corta la cadena.
 * 2. ZERO I/O: La política es pura sobre (registro, snapshot, método);
 *    los estratos superiores proveen ambas entradas ya hidratadas.
 * 3. SYNTHETIC TRUST: La credencial 'TrustedVerifier' se resuelve por
 *    conteo de confirmaciones exitosas, jamás por persistencia.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use veritas_domain_models::{
    CredentialKind, DenialReason, SubjectSnapshot, VerificationLevel, VerificationMethod,
    VerifierRecord,
};

/// Credenciales que eximen del nivel mínimo de verificación propia.
const LEVEL_EXEMPT_CREDENTIALS: [CredentialKind; 3] = [
    CredentialKind::NotaryPublic,
    CredentialKind::Attorney,
    CredentialKind::GovernmentOfficial,
];

/// Credenciales habilitantes para la saga presencial de dos verificadores.
const IN_PERSON_CREDENTIALS: [CredentialKind; 7] = [
    CredentialKind::NotaryPublic,
    CredentialKind::Attorney,
    CredentialKind::CommunityLeader,
    CredentialKind::VerifiedBusinessOwner,
    CredentialKind::OrganizationDirector,
    CredentialKind::GovernmentOfficial,
    CredentialKind::TrustedVerifier,
];

/// Veredicto afirmativo: el verificador puede atestar el método objetivo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authorization {
    pub verifier_id: uuid::Uuid,
    pub credentials: Vec<CredentialKind>,
    pub successful_confirmations: u32,
}

/// Evalúa la cadena de reglas de autorización. Primera coincidencia gana.
///
/// # Logic:
/// 1. Registro revocado → 'Revoked'.
/// 2. Nivel propio < Standard sin credencial eximente → 'BelowMinimumLevel'.
/// 3. Saga presencial sin credencial habilitante → 'NotAVerifier'.
/// 4. 'TrustedVerifier' es sintética: ≥ 50 confirmaciones exitosas.
/// 5. En otro caso → Autorización con credenciales y conteo.
pub fn authorize(
    record: &VerifierRecord,
    verifier_snapshot: &SubjectSnapshot,
    target_method: VerificationMethod,
    _now: DateTime<Utc>,
) -> Result<Authorization, DenialReason> {
    if record.revoked_at.is_some() || !record.authorized {
        return Err(DenialReason::Revoked);
    }

    if verifier_snapshot.level < VerificationLevel::Standard
        && !record.holds_any(&LEVEL_EXEMPT_CREDENTIALS)
    {
        return Err(DenialReason::BelowMinimumLevel);
    }

    if target_method == VerificationMethod::TwoPartyInPerson
        && !record.holds_any(&IN_PERSON_CREDENTIALS)
    {
        return Err(DenialReason::NotAVerifier);
    }

    let mut effective_credentials: Vec<CredentialKind> =
        record.credentials.iter().copied().collect();
    if record.holds(CredentialKind::TrustedVerifier)
        && !effective_credentials.contains(&CredentialKind::TrustedVerifier)
    {
        effective_credentials.push(CredentialKind::TrustedVerifier);
    }

    Ok(Authorization {
        verifier_id: record.subject_id,
        credentials: effective_credentials,
        successful_confirmations: record.successful_confirmations,
    })
}
