// [apps/orchestrator/src/main.rs]
/*!
 * =================================================================
 * APARATO: ORCHESTRATOR MAIN ENTRY POINT (V4.0 - GOLD MASTER)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L3)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * # Mathematical Proof (Deterministic Ignition):
 * El proceso garantiza que el esquema del Ledger se cristalice antes de
 * aceptar mando alguno, previniendo estados de carrera en el Motor A.
 * =================================================================
 */

use dotenvy::dotenv;
use tracing::{error, info};
use veritas_orchestrator::prelude::*;
use veritas_shared_heimdall::init_tracing;

/// Punto de ignición supremo del binario del motor de verificación.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. CARGA DE ENTORNO SOBERANO
    dotenv().ok();

    // 2. INICIALIZACIÓN DE OBSERVABILIDAD NEURAL (HEIMDALL)
    init_tracing("veritas_orchestrator");

    // 3. CONFIGURACIÓN DEL RUNTIME SOBERANO
    let runtime_orchestrator = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime_orchestrator.block_on(async {
        info!("🛰️  [COMMAND_CENTER]: Global ignition sequence starting...");

        // 4. ADQUISICIÓN DE COORDENADAS TÁCTICAS
        let database_connection_url = std::env::var("DATABASE_URL")
            .expect("CRITICAL_FAULT: DATABASE_URL not defined in runtime environment.");
        let database_access_token = std::env::var("TURSO_AUTH_TOKEN").ok();

        let settings = EngineSettings::capture_from_environment();

        // 5. CONSTRUCCIÓN DEL KERNEL SOBERANO (ESTRATO L1-APP)
        let kernel_instance = match EngineKernel::ignite(
            &database_connection_url,
            database_access_token,
            settings,
        )
        .await
        {
            Ok(kernel) => kernel,
            Err(ignition_fault) => {
                error!("❌ [IGNITION_FAILED]: Kernel collapse: {:#}.", ignition_fault);
                std::process::exit(1);
            }
        };

        // 6. IGNICIÓN DE OPERACIONES PERPETUAS
        if let Err(operations_fault) = kernel_instance.launch_sovereign_operations().await {
            error!("❌ [OPERATIONS_FAULT]: {:#}.", operations_fault);
            std::process::exit(1);
        }

        Ok(())
    })
}
