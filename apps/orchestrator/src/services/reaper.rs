// [apps/orchestrator/src/services/reaper.rs]
/*!
 * =================================================================
 * APARATO: THE REAPER SYSTEM SERVICE (V4.0 - TOKEN HYGIENE)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: PURGA PERPETUA DE TOKENS QR VENCIDOS
 *
 * La expiración de compleciones tiene su propio temporizador durable
 * dentro de cada orquestador; este daemon solo retira del almacén los
 * tokens QR cuya vigencia física ya venció.
 * =================================================================
 */

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{error, info};
use veritas_infra_db::TokenRepository;

/// Ciclo de escrutinio del almacén de tokens.
const TOKEN_SWEEP_INTERVAL_SECONDS: u64 = 3600;

/// Inicia el servicio de limpieza perpetua en el runtime de Tokio.
pub fn spawn_reaper(token_repository: Arc<TokenRepository>) {
    let mut maintenance_ticker = interval(Duration::from_secs(TOKEN_SWEEP_INTERVAL_SECONDS));

    tokio::spawn(async move {
        info!("💀 [REAPER_ACTIVE]: Token hygiene daemon initiated.");

        loop {
            maintenance_ticker.tick().await;

            match token_repository.prune_expired().await {
                Ok(pruned) if pruned > 0 => {
                    info!("💀 [REAPER_CLEANUP]: Evicted {} expired QR tokens.", pruned);
                }
                Ok(_) => {}
                Err(prune_fault) => {
                    error!("❌ [REAPER_FAULT]: Token sweep failed: {}.", prune_fault);
                }
            }
        }
    });
}
