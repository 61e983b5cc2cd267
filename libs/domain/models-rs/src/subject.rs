// [libs/domain/models-rs/src/subject.rs]
/*!
 * =================================================================
 * APARATO: SUBJECT DOMAIN MODELS (V4.0 - TRUST STRATA)
 * CLASIFICACIÓN: DOMAIN ENTITIES (L2)
 * RESPONSABILIDAD: IDENTIFICACIÓN SOBERANA DE SUJETOS DE CONFIANZA
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use typeshare::typeshare;
use uuid::Uuid;

/// Identificador opaco de 128 bits de un sujeto registrado en la plataforma.
pub type SubjectId = Uuid;

/// Clase del sujeto. Determina qué métodos de verificación le aplican.
#[typeshare]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectClass {
    Individual,
    Business,
    Organization,
}

impl SubjectClass {
    /// Etiqueta nominal para el rastro del Panóptico.
    pub fn as_label(&self) -> &'static str {
        match self {
            SubjectClass::Individual => "individual",
            SubjectClass::Business => "business",
            SubjectClass::Organization => "organization",
        }
    }
}
