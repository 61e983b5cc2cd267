// [apps/orchestrator/src/lib.rs]
/*!
 * =================================================================
 * APARATO: ORCHESTRATOR LIBRARY ROOT (V4.1 - COMMAND CENTER)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L1-APP)
 * RESPONSABILIDAD: EXPOSICIÓN NOMINAL DE LOS ESTRATOS DEL MOTOR
 * =================================================================
 */

/// Captura de configuración del entorno.
pub mod bootstrap;

/// Núcleo de ignición y operaciones perpetuas.
pub mod kernel;

/// Estado compartido del motor (placa base neural).
pub mod state;

/// Gateway de mandos y consultas con índice de orquestadores.
pub mod gateway;

/// Orquestador de vida indefinida por sujeto.
pub mod orchestrator;

/// Servicios de fondo: bus de eventos, relevo de notificaciones, reaper.
pub mod services;

/// Preludio nominal para los binarios del motor.
pub mod prelude {
    pub use crate::bootstrap::EngineSettings;
    pub use crate::gateway::VerificationGateway;
    pub use crate::kernel::EngineKernel;
    pub use crate::state::EngineState;
}
