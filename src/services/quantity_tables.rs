//! Per-material-type quantity tables.
//!
//! Built once per MTO from the relevant order/receipt documents. Every
//! lookup defaults to zero: a material with no receipts is simply at zero
//! received, never an error.
//!
//! The remaining-quantity rule differs by type on purpose. Self-made
//! materials have no source-side remaining field, so remaining is derived
//! as order minus received at record-build time. Purchased and
//! subcontracted orders carry their own cumulative remaining-to-receive
//! figure, which tracks order amendments that a derived formula would miss,
//! and that figure is used as-is.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::sources::forms::{ProductionReceiptRow, PurchaseOrderRow, PurchaseReceiptRow, SubcontractOrderRow};

pub const SRC_PRODUCTION_RECEIPT: &str = "PRD_INSTOCK";
pub const SRC_PURCHASE_RECEIPT: &str = "STK_InStock(type=purchased)";
pub const SRC_SUBCONTRACT_RECEIPT: &str = "STK_InStock(type=subcontracted)";

/// Order / received / remaining quantities keyed by material code, plus a
/// provenance tag naming the document type the receipts came from.
#[derive(Debug, Clone)]
pub struct TypeQuantities {
    order: HashMap<String, Decimal>,
    received: HashMap<String, Decimal>,
    remaining: HashMap<String, Decimal>,
    pub source: &'static str,
}

impl TypeQuantities {
    fn empty(source: &'static str) -> Self {
        Self {
            order: HashMap::new(),
            received: HashMap::new(),
            remaining: HashMap::new(),
            source,
        }
    }

    pub fn order_qty(&self, code: &str) -> Decimal {
        self.order.get(code).copied().unwrap_or_default()
    }

    pub fn received_qty(&self, code: &str) -> Decimal {
        self.received.get(code).copied().unwrap_or_default()
    }

    pub fn remaining_qty(&self, code: &str) -> Decimal {
        self.remaining.get(code).copied().unwrap_or_default()
    }
}

fn sum_into(map: &mut HashMap<String, Decimal>, code: &str, qty: Decimal) {
    *map.entry(code.to_string()).or_default() += qty;
}

/// Self-made: received quantities from production receipts, grouped by
/// material code only. Order quantity comes from the BOM's own need figure,
/// so the order and remaining maps stay empty here.
pub fn self_made(receipts: &[ProductionReceiptRow]) -> TypeQuantities {
    let mut table = TypeQuantities::empty(SRC_PRODUCTION_RECEIPT);
    for row in receipts {
        sum_into(&mut table.received, &row.material_code, row.real_qty);
    }
    table
}

/// Purchased: orders from purchase-order lines; receipts from the shared
/// inbound form filtered to the purchase bill type; remaining read directly
/// from the order's cumulative field.
pub fn purchased(
    orders: &[PurchaseOrderRow],
    receipts: &[PurchaseReceiptRow],
    bill_type: &str,
) -> TypeQuantities {
    let mut table = TypeQuantities::empty(SRC_PURCHASE_RECEIPT);
    for row in orders {
        sum_into(&mut table.order, &row.material_code, row.qty);
        sum_into(&mut table.remaining, &row.material_code, row.remain_receive_qty);
    }
    for row in receipts {
        if row.bill_type == bill_type {
            sum_into(&mut table.received, &row.material_code, row.real_qty);
        }
    }
    table
}

/// Subcontracted: structurally the purchased table with the other bill-type
/// code on the shared receipt form, sourced from subcontracting orders.
pub fn subcontracted(
    orders: &[SubcontractOrderRow],
    receipts: &[PurchaseReceiptRow],
    bill_type: &str,
) -> TypeQuantities {
    let mut table = TypeQuantities::empty(SRC_SUBCONTRACT_RECEIPT);
    for row in orders {
        sum_into(&mut table.order, &row.material_code, row.qty);
        sum_into(&mut table.remaining, &row.material_code, row.remain_receive_qty);
    }
    for row in receipts {
        if row.bill_type == bill_type {
            sum_into(&mut table.received, &row.material_code, row.real_qty);
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn po(code: &str, qty: Decimal, remaining: Decimal) -> PurchaseOrderRow {
        PurchaseOrderRow {
            bill_no: "PO001".into(),
            mto_no: "AK1".into(),
            material_code: code.into(),
            material_name: String::new(),
            specification: String::new(),
            aux_id: 0,
            aux_text: String::new(),
            qty,
            remain_receive_qty: remaining,
        }
    }

    fn receipt(code: &str, bill_type: &str, qty: Decimal) -> PurchaseReceiptRow {
        PurchaseReceiptRow {
            bill_no: "IN001".into(),
            mto_no: "AK1".into(),
            material_code: code.into(),
            bill_type: bill_type.into(),
            real_qty: qty,
        }
    }

    #[test]
    fn missing_codes_default_to_zero() {
        let table = self_made(&[]);
        assert_eq!(table.order_qty("05.01.001"), Decimal::ZERO);
        assert_eq!(table.received_qty("05.01.001"), Decimal::ZERO);
        assert_eq!(table.remaining_qty("05.01.001"), Decimal::ZERO);
    }

    #[test]
    fn self_made_sums_receipts_by_code() {
        let rows = vec![
            ProductionReceiptRow {
                bill_no: "IN1".into(),
                mto_no: "AK1".into(),
                material_code: "05.01.001".into(),
                real_qty: dec!(12),
            },
            ProductionReceiptRow {
                bill_no: "IN2".into(),
                mto_no: "AK1".into(),
                material_code: "05.01.001".into(),
                real_qty: dec!(8),
            },
        ];
        let table = self_made(&rows);
        assert_eq!(table.received_qty("05.01.001"), dec!(20));
        assert_eq!(table.source, SRC_PRODUCTION_RECEIPT);
    }

    #[test]
    fn purchased_filters_receipts_by_bill_type() {
        let orders = vec![po("08.02.100", dec!(100), dec!(70))];
        let receipts = vec![
            receipt("08.02.100", "RKD01_SYS", dec!(30)),
            // Subcontract receipt on the shared form: must not count here.
            receipt("08.02.100", "RKD03_SYS", dec!(99)),
        ];
        let table = purchased(&orders, &receipts, "RKD01_SYS");
        assert_eq!(table.order_qty("08.02.100"), dec!(100));
        assert_eq!(table.received_qty("08.02.100"), dec!(30));
        assert_eq!(table.remaining_qty("08.02.100"), dec!(70));
    }

    #[test]
    fn purchased_remaining_is_the_source_field_not_a_derivation() {
        // Partial receipt then order amendment: 100 ordered, 40 received,
        // but the ERP says 70 remain. The direct field wins.
        let orders = vec![po("08.02.100", dec!(100), dec!(70))];
        let receipts = vec![receipt("08.02.100", "RKD01_SYS", dec!(40))];
        let table = purchased(&orders, &receipts, "RKD01_SYS");
        assert_eq!(table.remaining_qty("08.02.100"), dec!(70));
        assert_ne!(
            table.remaining_qty("08.02.100"),
            table.order_qty("08.02.100") - table.received_qty("08.02.100")
        );
    }
}
