//! Domain records emitted by the reconciliation engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Material sourcing taxonomy. The code prefix is the primary signal; the
/// integer flag carried on bill-of-material lines is authoritative there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialType {
    Finished,
    SelfMade,
    Purchased,
    Subcontracted,
}

impl MaterialType {
    /// Decode the explicit `material_type` flag found on BOM lines
    /// (1 = self-made, 2 = purchased, 3 = subcontracted).
    pub fn from_bom_flag(flag: i64) -> Option<Self> {
        match flag {
            1 => Some(MaterialType::SelfMade),
            2 => Some(MaterialType::Purchased),
            3 => Some(MaterialType::Subcontracted),
            _ => None,
        }
    }

    /// Display label used on outgoing records.
    pub fn label(&self) -> &'static str {
        match self {
            MaterialType::Finished => "finished goods",
            MaterialType::SelfMade => "self-made",
            MaterialType::Purchased => "purchased",
            MaterialType::Subcontracted => "subcontracted",
        }
    }
}

/// Order-level record, one per MTO. Built fresh on every reconciliation from
/// the most recent matching production-order and sales-order rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentRecord {
    pub mto_no: String,
    /// Bill number of the leading production order.
    pub bill_no: String,
    pub material_code: String,
    pub material_name: String,
    pub specification: String,
    pub order_qty: Decimal,
    /// Customer name from the matching sales order, empty when none matched.
    pub customer: String,
    /// Delivery date from the matching sales order, as supplied by the wire.
    pub delivery_date: Option<String>,
}

/// Per-material fulfillment status within one MTO.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialStatus {
    pub material_code: String,
    pub material_name: String,
    pub specification: String,
    /// Resolved variant description, or the row's own inline variant text
    /// when resolution had no entry for the id.
    pub aux_property: String,
    pub material_type: MaterialType,
    pub type_label: String,

    // Demand side.
    pub required_qty: Decimal,
    pub order_qty: Decimal,

    // Supply side.
    pub receipt_qty: Decimal,
    pub unreceived_qty: Decimal,

    // Picking side.
    pub picked_qty: Decimal,
    pub unpicked_qty: Decimal,
    pub pick_request_qty: Decimal,
    pub pick_actual_qty: Decimal,

    // Delivery side. `inventory_qty` is not computed in this scope and is
    // always zero.
    pub delivered_qty: Decimal,
    pub inventory_qty: Decimal,

    /// Which document type supplied the receipt figure.
    pub receipt_source: String,
}

/// The payload returned by `get_status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MtoStatusResponse {
    pub parent: ParentRecord,
    pub children: Vec<MaterialStatus>,
}
