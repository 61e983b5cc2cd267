// [libs/domain/scoring/src/lib.rs]
/*!
 * =================================================================
 * APARATO: SCORING MODEL ROOT (V3.2 - PURE STRATUM)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: CONVERSIÓN DE EVIDENCIA VERIFICADA EN CONFIANZA SOBERANA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ZERO I/O: Toda función de esta crate es pura y determinista; el
 *    mismo journal produce siempre el mismo snapshot (Ley P1).
 * 2. SINGLE CATALOG: El catálogo estático de métodos es la única
 *    autoridad de puntos, multiplicadores, decaimiento y aplicabilidad.
 * 3. FOLD AUTHORITY: La proyección del journal vive junto al modelo de
 *    puntaje para que reconstrucción, recuperación y certificación
 *    compartan una sola función de pliegue.
 * =================================================================
 */

/// Catálogo estático de políticas por método (puntos, decaimiento, familia).
pub mod catalog;

/// Funciones puras de puntaje, niveles y sugerencia de rutas.
pub mod engine;

/// Pliegue determinista del journal hacia el snapshot del sujeto.
pub mod projection;

pub use catalog::{Applicability, EffortBand, MethodPolicy, ProtocolFamily};
pub use engine::{applicable, expiry_for, is_expired, level, max_multiplier, next_level, score, threshold};
pub use projection::{fold, fold_from, FoldError};
