// [libs/domain/scoring/src/engine.rs]
/*!
 * =================================================================
 * APARATO: TRUST SCORING ENGINE (V4.0 - DETERMINISTIC LAWS)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: PUNTAJE, NIVELES, DECAIMIENTO Y RUTAS SUGERIDAS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. THRESHOLD INCLUSIVITY: Un puntaje exactamente en el umbral otorga
 *    el nivel superior (Ley B1).
 * 2. CAPPED MULTIPLIERS: Las compleciones por encima del multiplicador
 *    se preservan en el journal pero no suman puntaje (Ley P6).
 * 3. DETERMINISTIC SUGGESTIONS: El sugeridor de rutas desempata por
 *    puntos, luego esfuerzo, luego orden canónico de la enumeración.
 *
 * # Mathematical Proof (Monotonic Levels):
 * 'level' es una función escalonada no decreciente del puntaje: para
 * todo s1 ≤ s2 se cumple level(s1) ≤ level(s2) (Ley P2).
 * =================================================================
 */

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use veritas_domain_models::{
    MethodCompletion, NextLevelView, SubjectClass, SuggestedPath, VerificationLevel,
    VerificationMethod,
};

use crate::catalog::{self, EffortBand};

/// Máxima cardinalidad de una ruta sugerida hacia el próximo nivel.
const SUGGESTED_PATH_MAX_METHODS: usize = 3;
/// Máximo de rutas sugeridas retornadas al llamador.
const SUGGESTED_PATHS_LIMIT: usize = 5;

/// Umbral de puntaje de un nivel de verificación.
pub fn threshold(level: VerificationLevel) -> i64 {
    match level {
        VerificationLevel::Unverified => 0,
        VerificationLevel::Minimal => 100,
        VerificationLevel::Standard => 250,
        VerificationLevel::Enhanced => 400,
        VerificationLevel::Complete => 600,
    }
}

/// Deriva el nivel desde el puntaje: el máximo nivel cuyo umbral queda
/// cubierto. Puntaje exactamente en el umbral otorga el nivel superior.
pub fn level(score: i64) -> VerificationLevel {
    if score >= threshold(VerificationLevel::Complete) {
        VerificationLevel::Complete
    } else if score >= threshold(VerificationLevel::Enhanced) {
        VerificationLevel::Enhanced
    } else if score >= threshold(VerificationLevel::Standard) {
        VerificationLevel::Standard
    } else if score >= threshold(VerificationLevel::Minimal) {
        VerificationLevel::Minimal
    } else {
        VerificationLevel::Unverified
    }
}

/// Decide si un método aplica a una clase de sujeto.
pub fn applicable(method: VerificationMethod, class: SubjectClass) -> bool {
    catalog::policy(method).applicable.covers(class)
}

/// Multiplicador máximo de compleciones contables de un método.
pub fn max_multiplier(method: VerificationMethod) -> u32 {
    catalog::policy(method).max_multiplier
}

/// Expiración derivada de una compleción: presente si y solo si el método
/// decae. Aritmética de días exactos en UTC.
pub fn expiry_for(method: VerificationMethod, completed_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let decay = catalog::policy(method).decay_days;
    if decay > 0 {
        Some(completed_at + Duration::days(decay))
    } else {
        None
    }
}

/// Decide si una compleción está vencida. El límite es inclusivo: en el
/// instante exacto de 'expires_at' la compleción sigue vigente.
pub fn is_expired(completion: &MethodCompletion, now: DateTime<Utc>) -> bool {
    match completion.expires_at {
        Some(expires_at) => now > expires_at,
        None => false,
    }
}

/// Puntaje total del sujeto: Σ min(compleciones, multiplicador) × base,
/// sobre los métodos aplicables a la clase. Métodos no aplicables suman 0.
pub fn score(
    completions: &BTreeMap<VerificationMethod, Vec<MethodCompletion>>,
    class: SubjectClass,
) -> i64 {
    completions
        .iter()
        .filter(|(method, _)| applicable(**method, class))
        .map(|(method, entries)| {
            let entry = catalog::policy(*method);
            let countable = (entries.len() as u32).min(entry.max_multiplier) as i64;
            countable * entry.base_points
        })
        .sum()
}

/// Computa el objetivo de ascenso y hasta cinco rutas sugeridas.
///
/// # Logic:
/// 1. Candidatos: métodos aplicables con capacidad remanente de multiplicador.
/// 2. El aporte de un método es su capacidad remanente × puntos base.
/// 3. Subconjuntos de hasta tres métodos cuyo aporte cubre el faltante.
/// 4. Ranking: puntos ascendente, esfuerzo ascendente, orden canónico.
pub fn next_level(
    current_score: i64,
    class: SubjectClass,
    completed_counts: &BTreeMap<VerificationMethod, u32>,
) -> NextLevelView {
    let current = level(current_score);

    let target = match current {
        VerificationLevel::Unverified => VerificationLevel::Minimal,
        VerificationLevel::Minimal => VerificationLevel::Standard,
        VerificationLevel::Standard => VerificationLevel::Enhanced,
        VerificationLevel::Enhanced => VerificationLevel::Complete,
        VerificationLevel::Complete => {
            return NextLevelView {
                target_level: VerificationLevel::Complete,
                points_needed: 0,
                suggested_paths: Vec::new(),
            };
        }
    };

    let points_needed = threshold(target) - current_score;

    // Candidatos en orden canónico: (método, aporte máximo, esfuerzo).
    let candidates: Vec<(VerificationMethod, i64, EffortBand)> = VerificationMethod::ALL
        .iter()
        .filter(|method| applicable(**method, class))
        .filter_map(|method| {
            let entry = catalog::policy(*method);
            let used = completed_counts.get(method).copied().unwrap_or(0);
            let remaining = entry.max_multiplier.saturating_sub(used);
            if remaining == 0 {
                return None;
            }
            Some((*method, remaining as i64 * entry.base_points, entry.effort))
        })
        .collect();

    let mut paths: Vec<(i64, u32, SuggestedPath)> = Vec::new();
    let mut combination_indices: Vec<usize> = Vec::with_capacity(SUGGESTED_PATH_MAX_METHODS);
    enumerate_subsets(&candidates, points_needed, 0, &mut combination_indices, &mut paths);

    paths.sort_by(|lhs, rhs| {
        lhs.0
            .cmp(&rhs.0)
            .then(lhs.1.cmp(&rhs.1))
            .then(lhs.2.methods.cmp(&rhs.2.methods))
    });
    paths.truncate(SUGGESTED_PATHS_LIMIT);

    NextLevelView {
        target_level: target,
        points_needed,
        suggested_paths: paths.into_iter().map(|(_, _, path)| path).collect(),
    }
}

/// Enumera subconjuntos de candidatos (hasta la cardinalidad máxima) que
/// cubren el faltante, acumulando (puntos, esfuerzo, ruta).
fn enumerate_subsets(
    candidates: &[(VerificationMethod, i64, EffortBand)],
    points_needed: i64,
    start: usize,
    selected: &mut Vec<usize>,
    out: &mut Vec<(i64, u32, SuggestedPath)>,
) {
    if !selected.is_empty() {
        let total: i64 = selected.iter().map(|index| candidates[*index].1).sum();
        if total >= points_needed {
            let effort: u32 = selected
                .iter()
                .map(|index| candidates[*index].2.rank() as u32)
                .sum();
            out.push((
                total,
                effort,
                SuggestedPath {
                    methods: selected.iter().map(|index| candidates[*index].0).collect(),
                    total_points: total,
                },
            ));
            // Todo superconjunto solo agrega puntos y esfuerzo; se poda.
            return;
        }
    }

    if selected.len() == SUGGESTED_PATH_MAX_METHODS {
        return;
    }

    for index in start..candidates.len() {
        selected.push(index);
        enumerate_subsets(candidates, points_needed, index + 1, selected, out);
        selected.pop();
    }
}
