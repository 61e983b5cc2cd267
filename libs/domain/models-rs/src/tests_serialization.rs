// [libs/domain/models-rs/src/tests_serialization.rs]
/**
 * =================================================================
 * APARATO: DOMAIN SERIALIZATION TEST (V6.1 - INTEGRATION LEVEL)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L2-MODELS)
 * RESPONSABILIDAD: CERTIFICACIÓN DE PARIDAD JSON DEL CONTRATO DE DOMINIO
 *
 * # Mathematical Proof (Wire Stability):
 * El Dashboard TypeScript y el Ledger táctico consumen estos tipos en
 * 'snake_case'. Cualquier deriva del discriminador serde rompe la paridad
 * de lectura del journal histórico; este aparato la detecta.
 * =================================================================
 */
