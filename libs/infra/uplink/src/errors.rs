// [libs/infra/uplink/src/errors.rs]
/*!
 * =================================================================
 * APARATO: UPLINK ERROR CATALOG (V2.0 - SOBERANO)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE ENLACE EXTERNO
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UplinkError {
    /// El cliente de red no pudo forjarse (configuración TLS/headers).
    #[error("[L3_UPLINK_FAULT]: CLIENT_IGNITION_FAILURE -> {0}")]
    ClientIgnition(String),

    /// Fallo físico del enlace (DNS, TCP, timeout).
    #[error("[L3_UPLINK_FAULT]: PHYSICAL_LINK_FAILURE -> {0}")]
    LinkFailure(#[from] reqwest::Error),

    /// El colaborador rechazó la ráfaga con un estatus no exitoso.
    #[error("[L3_UPLINK_FAULT]: COLLABORATOR_REJECTION -> HTTP_{status}")]
    Rejection { status: u16 },

    /// La respuesta del colaborador no respeta el contrato esperado.
    #[error("[L3_UPLINK_FAULT]: CONTRACT_VIOLATION -> {0}")]
    ContractViolation(String),
}
