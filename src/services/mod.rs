//! Business logic: BOM aggregation, quantity tables, variant resolution and
//! the reconciliation engine that orchestrates them.

pub mod aux_props;
pub mod bom_rollup;
pub mod mto_status;
pub mod quantity_tables;

pub use aux_props::AuxPropertyResolver;
pub use mto_status::{MaterialPrefixes, MtoStatusService, ReconcileConfig, StatusOptions};
