//! Source readers: one generic reader pattern instantiated for each of the
//! nine ERP document types.
//!
//! Each form is described declaratively: its form id, an ordered
//! field-mapping table and, for MTO-keyed forms, which wire field carries
//! the MTO number. Field names vary by form in both spelling and case
//! (`FMtoNo` on most forms, `FMTONO` on the BOM); the configs here
//! encapsulate that so no caller ever sees a raw wire name.

pub mod forms;
pub mod reader;
pub mod row;

pub use reader::{convert_rows, SourceReader, MTO_BATCH};
pub use row::{field, Converter, FieldSpec, RowValues};

/// How a form's rows are matched against an MTO number.
#[derive(Debug, Clone, Copy)]
pub struct MtoMatch {
    /// Wire fields that can carry the MTO number. Most forms have exactly
    /// one; sales orders record it in either of two fields depending on
    /// document age.
    pub fields: &'static [&'static str],
    /// Prefix match (`LIKE 'mto%'`) instead of equality, for forms where
    /// related sub-orders share a numeric prefix with suffix variants.
    pub prefix: bool,
}

/// A typed ERP document row with its declarative wire mapping.
pub trait ErpForm: Sized + Send + Sync + 'static {
    const FORM_ID: &'static str;
    const FIELDS: &'static [FieldSpec];

    /// Build a typed row from coerced values. Total: coercion already
    /// defaulted anything missing or malformed.
    fn from_row(row: &RowValues) -> Self;
}

/// Forms that can be queried by MTO number.
pub trait MtoKeyed: ErpForm {
    const MTO_MATCH: MtoMatch;
}

/// Forms fetched by a parent document's bill number (BOM lines belonging to
/// a known set of production orders).
pub trait BillKeyed: ErpForm {
    const BILL_NO_FIELD: &'static str;
}
