// [libs/domain/protocols/src/platform_record.rs]
/*!
 * =================================================================
 * APARATO: PLATFORM RECORD PROTOCOL (V2.0 - TELEMETRY GRANT)
 * CLASIFICACIÓN: DOMAIN STATE MACHINE (ESTRATO L2)
 * RESPONSABILIDAD: REGISTRO DIRECTO DE TELEMETRÍA DE PLATAFORMA
 *
 * Los métodos de historial (PlatformHistory, TransactionHistory) se
 * acreditan con métricas computadas por la propia plataforma: el payload
 * llega ya evaluado y el protocolo completa en el arranque, sellando el
 * hash del material como evidencia.
 * =================================================================
 */

use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};
use veritas_domain_models::FailureReason;

use crate::contract::{ProtocolContext, ProtocolOutcome};

/// Completa el registro de telemetría en el arranque.
#[instrument(skip(context, params), fields(method = %context.method.as_label(), run = %context.protocol_run_id))]
pub async fn execute(context: ProtocolContext, params: serde_json::Value) -> ProtocolOutcome {
    if params.is_null() || !params.is_object() {
        warn!("🚫 [PLATFORM_RECORD]: Empty telemetry payload rejected.");
        return ProtocolOutcome::Failed(FailureReason::Rejected {
            detail: Some("missing_telemetry".into()),
        });
    }

    let serialized = params.to_string();
    let evidence_ref = hex::encode(Sha256::digest(serialized.as_bytes()));

    info!("📈 [PLATFORM_RECORD]: Telemetry grant sealed for run [{}].", context.protocol_run_id);

    ProtocolOutcome::Completed { evidence_ref, data: params }
}
