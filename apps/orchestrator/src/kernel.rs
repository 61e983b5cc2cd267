// [apps/orchestrator/src/kernel.rs]
/*!
 * =================================================================
 * APARATO: ENGINE KERNEL (V4.0 - SOVEREIGN IGNITION)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L1-APP)
 * RESPONSABILIDAD: SINAPSIS L3 (PERSISTENCIA) ↔ L1 (ORQUESTACIÓN)
 *
 * # Mathematical Proof (Deterministic Ignition):
 * El esquema del Ledger se aplica antes de indexar orquestador alguno,
 * previniendo estados de carrera donde un mando llegue antes de que
 * las tablas estén cristalizadas en el Motor A.
 * =================================================================
 */

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use veritas_domain_protocols::Collaborators;
use veritas_infra_db::TursoClient;
use veritas_infra_uplink::{HttpCodeDelivery, HttpNotificationSink, HttpReviewQueue};

use crate::bootstrap::EngineSettings;
use crate::gateway::VerificationGateway;
use crate::services::reaper::spawn_reaper;
use crate::state::EngineState;

/// Núcleo del motor: estado compartido + gateway público.
pub struct EngineKernel {
    pub application_shared_state: EngineState,
    pub gateway: Arc<VerificationGateway>,
}

impl EngineKernel {
    /**
     * Ignición completa del motor: enlace táctico, colaboradores HTTP,
     * estado maestro y gateway.
     */
    pub async fn ignite(
        database_connection_url: &str,
        database_access_token: Option<String>,
        settings: EngineSettings,
    ) -> anyhow::Result<Self> {
        // 1. ENLACE TÁCTICO (Motor A) + ESQUEMA DEL LEDGER
        let database_client = TursoClient::connect(database_connection_url, database_access_token)
            .await
            .context("Tactical database link ignition failed")?;

        // 2. FORJA DE COLABORADORES EXTERNOS
        let collaborators = Self::forge_collaborators(&database_client, &settings)?;

        // 3. ESTADO MAESTRO + GATEWAY
        let state = EngineState::new(database_client, collaborators, settings);
        let gateway = Arc::new(VerificationGateway::new(state.clone()));

        info!("🛰️  [KERNEL]: Verification engine kernel levelized.");
        Ok(Self { application_shared_state: state, gateway })
    }

    /// Manojo de puertos: clientes HTTP para los colaboradores y los
    /// repositorios tácticos para journal, tokens y directorio.
    fn forge_collaborators(
        database_client: &TursoClient,
        settings: &EngineSettings,
    ) -> anyhow::Result<Collaborators> {
        use veritas_infra_db::{JournalRepository, TokenRepository, VerifierRepository};

        let journal = JournalRepository::new(database_client.clone());
        let verifiers = VerifierRepository::new(database_client.clone(), journal.clone());
        let tokens = TokenRepository::new(database_client.clone());

        Ok(Collaborators {
            code_delivery: Arc::new(
                HttpCodeDelivery::new(settings.code_delivery_endpoint.clone())
                    .context("Code delivery uplink ignition failed")?,
            ),
            review_queue: Arc::new(
                HttpReviewQueue::new(settings.review_queue_endpoint.clone())
                    .context("Review queue uplink ignition failed")?,
            ),
            notifications: Arc::new(
                HttpNotificationSink::new(settings.notification_endpoint.clone())
                    .context("Notification uplink ignition failed")?,
            ),
            token_store: Arc::new(tokens),
            verifier_directory: Arc::new(verifiers),
            journal: Arc::new(journal),
        })
    }

    /**
     * Ignición de operaciones perpetuas: daemons de higiene y espera
     * del pulso de apagado (Ctrl-C / SIGTERM).
     */
    pub async fn launch_sovereign_operations(self) -> anyhow::Result<()> {
        spawn_reaper(Arc::clone(&self.application_shared_state.tokens));

        info!("🚀 [VERITAS_ONLINE]: Verification engine fully operational.");

        tokio::signal::ctrl_c()
            .await
            .context("Shutdown signal listener collapsed")?;

        info!("🛑 [KERNEL]: Shutdown pulse received. Draining orchestrators.");
        Ok(())
    }
}
