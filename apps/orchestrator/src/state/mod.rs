// [apps/orchestrator/src/state/mod.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN STATE ORCHESTRATOR (V4.0 - TRUST NEXUS)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L1-APP)
 * RESPONSABILIDAD: PLACA BASE NEURAL DEL MOTOR DE VERIFICACIÓN
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. COMPOSITION ROOT: Centraliza el rastro de los repositorios
 *    tácticos, el manojo de colaboradores y los servicios de fondo.
 * 2. NOMINAL PURITY: Uso de 'Arc<T>' para inmutabilidad compartida;
 *    los orquestadores por sujeto jamás comparten estado mutable.
 * =================================================================
 */

use std::sync::Arc;

use tracing::debug;
use veritas_domain_protocols::Collaborators;
use veritas_infra_db::{
    CheckpointRepository, CommandLedgerRepository, JournalRepository, TokenRepository,
    TursoClient, VerifierRepository,
};

use crate::bootstrap::EngineSettings;
use crate::services::{EventBus, NotificationRelay};

/// Contenedor de estado compartido (Thread-Safe) del motor.
#[derive(Clone)]
pub struct EngineState {
    /// Cliente táctico para el Motor A (Turso Cloud / libSQL).
    pub database_client: TursoClient,
    /// Autoridad única del journal de verificación.
    pub journal: Arc<JournalRepository>,
    /// Directorio de verificadores y credenciales.
    pub verifiers: Arc<VerifierRepository>,
    /// Almacén de tokens QR de la saga presencial.
    pub tokens: Arc<TokenRepository>,
    /// Escudo de idempotencia de mandos.
    pub command_ledger: Arc<CommandLedgerRepository>,
    /// Marcadores de checkpoint de la proyección.
    pub checkpoints: Arc<CheckpointRepository>,
    /// Bus de eventos para la difusión de señales en tiempo real.
    pub event_bus: Arc<EventBus>,
    /// Relevo de notificaciones fuera de la ruta crítica.
    pub notifier: NotificationRelay,
    /// Manojo de puertos hacia los colaboradores externos.
    pub collaborators: Collaborators,
    /// Afinación operativa capturada en el bootstrap.
    pub settings: EngineSettings,
}

impl EngineState {
    /**
     * Forja el estado maestro inyectando el cliente y los colaboradores.
     *
     * # Logic:
     * Los repositorios se pre-hidratan una sola vez y se comparten por
     * 'Arc'; el puerto de journal de los protocolos ES el repositorio
     * del journal, garantizando un único árbitro de secuencias.
     */
    pub fn new(
        database_client: TursoClient,
        collaborators: Collaborators,
        settings: EngineSettings,
    ) -> Self {
        debug!("🧬 [ENGINE_STATE]: Executing sovereign ignition sequence V4.0...");

        let journal = Arc::new(JournalRepository::new(database_client.clone()));
        let verifiers = Arc::new(VerifierRepository::new(
            database_client.clone(),
            (*journal).clone(),
        ));
        let tokens = Arc::new(TokenRepository::new(database_client.clone()));
        let command_ledger = Arc::new(CommandLedgerRepository::new(database_client.clone()));
        let checkpoints = Arc::new(CheckpointRepository::new(database_client.clone()));

        let event_bus = Arc::new(EventBus::new());
        let notifier = NotificationRelay::new(
            Arc::clone(&collaborators.notifications),
            settings.tuning.side_effect_retry,
        );

        Self {
            database_client,
            journal,
            verifiers,
            tokens,
            command_ledger,
            checkpoints,
            event_bus,
            notifier,
            collaborators,
            settings,
        }
    }
}
