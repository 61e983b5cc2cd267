// [apps/orchestrator/src/services/mod.rs]
/*!
 * =================================================================
 * APARATO: APPLICATION SERVICES MATRIX (V3.0)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: SERVICIOS DE FONDO DEL CENTRO DE MANDO
 * =================================================================
 */

/// Difusión de señales en tiempo real hacia dashboards y daemons.
pub mod event_bus;

/// Relevo de notificaciones fuera de la ruta crítica de estado.
pub mod notifier;

/// Higiene perpetua: purga de tokens QR vencidos.
pub mod reaper;

pub use event_bus::{EngineSignal, EventBus};
pub use notifier::NotificationRelay;
