// [apps/orchestrator/src/services/event_bus.rs]
/*!
 * =================================================================
 * APARATO: NEURAL EVENT BUS SERVICE (V4.0 - TRUST BROADCASTER)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: DIFUSIÓN SOBERANA DE SEÑALES DE VERIFICACIÓN
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. NEVER AUTHORITATIVE: El bus es best-effort; el journal es la única
 *    autoridad. La pérdida de un suscriptor no afecta el determinismo.
 * 2. OPERATOR VISIBILITY: Las corridas atascadas en compensación se
 *    difunden como alertas de operador además del rastro del Panóptico.
 *
 * # Mathematical Proof (Signal Propagation):
 * El Bus garantiza un tiempo de despacho O(1) independientemente del
 * número de receptores (Lock-Free Emission).
 * =================================================================
 */

use tokio::sync::broadcast;
use tracing::{error, info, trace, warn};
use uuid::Uuid;
use veritas_domain_models::{EventKind, VerificationLevel, VerificationMethod};

/// Capacidad del canal de difusión soberano.
const SOVEREIGN_CHANNEL_CAPACITY: usize = 4096;

/// Señal de tiempo real difundida por el motor.
#[derive(Debug, Clone)]
pub enum EngineSignal {
    /// Un evento quedó comprometido en el journal de un sujeto.
    JournalSealed {
        subject_id: Uuid,
        seq: u64,
        kind: EventKind,
    },
    /// El nivel de verificación de un sujeto transicionó.
    LevelShift {
        subject_id: Uuid,
        old_level: VerificationLevel,
        new_level: VerificationLevel,
        score: i64,
    },
    /// Una saga quedó atascada en compensación; requiere operador.
    CompensationStuck {
        subject_id: Uuid,
        method: VerificationMethod,
        protocol_run_id: Uuid,
    },
}

/// Orquestador central de señales en tiempo real (El Sistema Nervioso).
#[derive(Debug, Clone)]
pub struct EventBus {
    internal_transmission_channel: broadcast::Sender<EngineSignal>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(SOVEREIGN_CHANNEL_CAPACITY);
        Self { internal_transmission_channel: sender }
    }

    /// Genera un nuevo receptor para dashboards o daemons.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineSignal> {
        self.internal_transmission_channel.subscribe()
    }

    /// Difunde el sellado de un evento del journal.
    pub fn emit_journal_sealed(&self, subject_id: Uuid, seq: u64, kind: EventKind) {
        self.dispatch_signal(EngineSignal::JournalSealed { subject_id, seq, kind });
    }

    /// Difunde una transición de nivel.
    pub fn emit_level_shift(
        &self,
        subject_id: Uuid,
        old_level: VerificationLevel,
        new_level: VerificationLevel,
        score: i64,
    ) {
        info!(
            "📢 [EVENT_BUS]: Subject [{}] level shift {} -> {} (score {}).",
            subject_id,
            old_level.as_label(),
            new_level.as_label(),
            score
        );
        self.dispatch_signal(EngineSignal::LevelShift { subject_id, old_level, new_level, score });
    }

    /// Difunde una alerta de compensación atascada (atención de operador).
    pub fn emit_compensation_stuck(
        &self,
        subject_id: Uuid,
        method: VerificationMethod,
        protocol_run_id: Uuid,
    ) {
        warn!(
            "🚨 [OPERATOR_ALERT]: Compensation stuck on [{}] run [{}] for subject [{}].",
            method.as_label(),
            protocol_run_id,
            subject_id
        );
        self.dispatch_signal(EngineSignal::CompensationStuck { subject_id, method, protocol_run_id });
    }

    /// Motor interno de despacho con auditoría de congestión.
    fn dispatch_signal(&self, signal: EngineSignal) {
        match self.internal_transmission_channel.send(signal) {
            Ok(subscriber_count) => {
                if subscriber_count == 0 {
                    // Silencio nominal: sin operadores visualizando el Dashboard.
                    trace!("💤 [EVENT_BUS]: Signal discarded. No active neural links.");
                } else {
                    trace!("📡 [EVENT_BUS]: Signal broadcasted to {} active links.", subscriber_count);
                }
            }
            Err(_) => {
                error!("💀 [EVENT_BUS_FATAL]: Internal transmission channel collapsed.");
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
