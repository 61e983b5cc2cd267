// [libs/domain/protocols/src/backoff.rs]
/*!
 * =================================================================
 * APARATO: BOUNDED BACKOFF ENGINE (V2.3 - RESILIENCE PRIMITIVE)
 * CLASIFICACIÓN: DOMAIN UTILITY (ESTRATO L2)
 * RESPONSABILIDAD: REINTENTO ACOTADO CON RETROCESO EXPONENCIAL
 *
 * # Mathematical Proof (Bounded Wait):
 * La espera acumulada máxima es Σ min(initial × factor^k, cap) sobre
 * k ∈ [0, max_attempts); con los valores nominales (1s, ×2, tope 60s,
 * 10 intentos) el peor caso queda acotado por ~8.5 minutos.
 * =================================================================
 */

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

/// Política de reintento con retroceso exponencial y tope.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub backoff_factor: u32,
    pub delay_cap: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    /// Valores nominales del motor: 1 s inicial, factor 2, tope 60 s,
    /// 10 intentos máximos.
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2,
            delay_cap: Duration::from_secs(60),
            max_attempts: 10,
        }
    }
}

impl RetryPolicy {
    /// Política instantánea para el Proving Grounds: mismos intentos,
    /// sin espera real entre ellos.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            initial_delay: Duration::ZERO,
            backoff_factor: 1,
            delay_cap: Duration::ZERO,
            max_attempts,
        }
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let scaled = self
            .initial_delay
            .saturating_mul(self.backoff_factor.saturating_pow(attempt));
        scaled.min(self.delay_cap)
    }
}

/// Ejecuta la operación hasta el éxito o el agotamiento de la política.
///
/// # Errors:
/// Retorna el último fallo observado cuando los intentos se agotan.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: RetryPolicy,
    operation_label: &str,
    mut operation: F,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(fault) => {
                attempt += 1;
                if attempt >= policy.max_attempts {
                    warn!(
                        "⛔ [BACKOFF_EXHAUSTED]: Operation [{}] failed after {} attempts: {}",
                        operation_label, attempt, fault
                    );
                    return Err(fault);
                }

                let pause = policy.delay_for_attempt(attempt - 1);
                warn!(
                    "🔁 [BACKOFF_RETRY]: Operation [{}] attempt {}/{} failed: {}. Pausing {:?}.",
                    operation_label, attempt, policy.max_attempts, fault, pause
                );
                if !pause.is_zero() {
                    sleep(pause).await;
                }
            }
        }
    }
}
