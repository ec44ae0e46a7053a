//! The nine ERP document types, plus the variant-description lookup form.
//!
//! Field keys mirror the source system exactly, case irregularities
//! included (the BOM form spells its MTO column `FMTONO`). Quantity fields
//! are always coerced to `Decimal` so partial quantities survive intact.

use rust_decimal::Decimal;

use super::row::{field, Converter, FieldSpec};
use super::{ErpForm, BillKeyed, MtoKeyed, MtoMatch, RowValues};

/// Sales order (`SAL_SaleOrder`). The one dual-MTO-field form: older
/// documents carry the tracking number in `FOldMtoNo`, newer ones in
/// `FMtoNo`, and related sub-orders share a numeric prefix, so both fields
/// are matched by prefix.
#[derive(Debug, Clone)]
pub struct SalesOrderRow {
    pub bill_no: String,
    pub mto_no: String,
    pub old_mto_no: String,
    pub customer: String,
    pub delivery_date: Option<String>,
    pub material_code: String,
    pub qty: Decimal,
}

impl SalesOrderRow {
    /// The tracking number, whichever wire field carried it.
    pub fn mto(&self) -> &str {
        if self.mto_no.is_empty() {
            &self.old_mto_no
        } else {
            &self.mto_no
        }
    }
}

impl ErpForm for SalesOrderRow {
    const FORM_ID: &'static str = "SAL_SaleOrder";
    const FIELDS: &'static [FieldSpec] = &[
        field("bill_no", "FBillNo", Converter::Str),
        field("mto_no", "FMtoNo", Converter::Str),
        field("old_mto_no", "FOldMtoNo", Converter::Str),
        field("customer", "FCustId.FName", Converter::Str),
        field("delivery_date", "FDeliveryDate", Converter::OptStr),
        field("material_code", "FMaterialId.FNumber", Converter::Str),
        field("qty", "FQty", Converter::Decimal),
    ];

    fn from_row(row: &RowValues) -> Self {
        Self {
            bill_no: row.str("bill_no"),
            mto_no: row.str("mto_no"),
            old_mto_no: row.str("old_mto_no"),
            customer: row.str("customer"),
            delivery_date: row.opt_str("delivery_date"),
            material_code: row.str("material_code"),
            qty: row.dec("qty"),
        }
    }
}

impl MtoKeyed for SalesOrderRow {
    const MTO_MATCH: MtoMatch = MtoMatch {
        fields: &["FMtoNo", "FOldMtoNo"],
        prefix: true,
    };
}

/// Production order (`PRD_MO`). The anchor document: an MTO with no
/// production orders cannot be reconciled.
#[derive(Debug, Clone)]
pub struct ProductionOrderRow {
    pub bill_no: String,
    pub mto_no: String,
    pub material_code: String,
    pub material_name: String,
    pub specification: String,
    pub qty: Decimal,
}

impl ErpForm for ProductionOrderRow {
    const FORM_ID: &'static str = "PRD_MO";
    const FIELDS: &'static [FieldSpec] = &[
        field("bill_no", "FBillNo", Converter::Str),
        field("mto_no", "FMtoNo", Converter::Str),
        field("material_code", "FMaterialId.FNumber", Converter::Str),
        field("material_name", "FMaterialName", Converter::Str),
        field("specification", "FMaterialId.FSpecification", Converter::Str),
        field("qty", "FQty", Converter::Decimal),
    ];

    fn from_row(row: &RowValues) -> Self {
        Self {
            bill_no: row.str("bill_no"),
            mto_no: row.str("mto_no"),
            material_code: row.str("material_code"),
            material_name: row.str("material_name"),
            specification: row.str("specification"),
            qty: row.dec("qty"),
        }
    }
}

impl MtoKeyed for ProductionOrderRow {
    const MTO_MATCH: MtoMatch = MtoMatch {
        fields: &["FMtoNo"],
        prefix: false,
    };
}

/// Production BOM line (`PRD_PPBOM`), fetched by the owning production
/// order's bill number. Carries the authoritative material-type flag.
#[derive(Debug, Clone)]
pub struct BomLineRow {
    pub bill_no: String,
    pub mo_bill_no: String,
    pub mto_no: String,
    pub material_code: String,
    pub material_name: String,
    pub specification: String,
    /// 1 = self-made, 2 = purchased, 3 = subcontracted.
    pub material_type_flag: i64,
    pub aux_id: i64,
    pub aux_text: String,
    pub need_qty: Decimal,
    pub picked_qty: Decimal,
    pub unpicked_qty: Decimal,
}

impl ErpForm for BomLineRow {
    const FORM_ID: &'static str = "PRD_PPBOM";
    const FIELDS: &'static [FieldSpec] = &[
        field("bill_no", "FBillNo", Converter::Str),
        field("mo_bill_no", "FMOBillNO", Converter::Str),
        field("mto_no", "FMTONO", Converter::Str),
        field("material_code", "FMaterialId2.FNumber", Converter::Str),
        field("material_name", "FMaterialName", Converter::Str),
        field("specification", "FSpecification", Converter::Str),
        field("material_type_flag", "FMaterialType", Converter::Int),
        field("aux_id", "FAuxPropId", Converter::Int),
        field("aux_text", "FAuxPropId.FDataValue", Converter::Str),
        field("need_qty", "FMustQty", Converter::Decimal),
        field("picked_qty", "FPickedQty", Converter::Decimal),
        field("unpicked_qty", "FNoPickedQty", Converter::Decimal),
    ];

    fn from_row(row: &RowValues) -> Self {
        Self {
            bill_no: row.str("bill_no"),
            mo_bill_no: row.str("mo_bill_no"),
            mto_no: row.str("mto_no"),
            material_code: row.str("material_code"),
            material_name: row.str("material_name"),
            specification: row.str("specification"),
            material_type_flag: row.int("material_type_flag"),
            aux_id: row.int("aux_id"),
            aux_text: row.str("aux_text"),
            need_qty: row.dec("need_qty"),
            picked_qty: row.dec("picked_qty"),
            unpicked_qty: row.dec("unpicked_qty"),
        }
    }
}

impl MtoKeyed for BomLineRow {
    const MTO_MATCH: MtoMatch = MtoMatch {
        fields: &["FMTONO"],
        prefix: false,
    };
}

impl BillKeyed for BomLineRow {
    const BILL_NO_FIELD: &'static str = "FMOBillNO";
}

/// Production receipt (`PRD_INSTOCK`): finished self-made quantities.
#[derive(Debug, Clone)]
pub struct ProductionReceiptRow {
    pub bill_no: String,
    pub mto_no: String,
    pub material_code: String,
    pub real_qty: Decimal,
}

impl ErpForm for ProductionReceiptRow {
    const FORM_ID: &'static str = "PRD_INSTOCK";
    const FIELDS: &'static [FieldSpec] = &[
        field("bill_no", "FBillNo", Converter::Str),
        field("mto_no", "FMtoNo", Converter::Str),
        field("material_code", "FMaterialId.FNumber", Converter::Str),
        field("real_qty", "FRealQty", Converter::Decimal),
    ];

    fn from_row(row: &RowValues) -> Self {
        Self {
            bill_no: row.str("bill_no"),
            mto_no: row.str("mto_no"),
            material_code: row.str("material_code"),
            real_qty: row.dec("real_qty"),
        }
    }
}

impl MtoKeyed for ProductionReceiptRow {
    const MTO_MATCH: MtoMatch = MtoMatch {
        fields: &["FMtoNo"],
        prefix: false,
    };
}

/// Purchase order line (`PUR_PurchaseOrder`). `remain_receive_qty` is the
/// document's own cumulative remaining-to-receive figure and is used as-is
/// for purchased materials, never re-derived.
#[derive(Debug, Clone)]
pub struct PurchaseOrderRow {
    pub bill_no: String,
    pub mto_no: String,
    pub material_code: String,
    pub material_name: String,
    pub specification: String,
    pub aux_id: i64,
    pub aux_text: String,
    pub qty: Decimal,
    pub remain_receive_qty: Decimal,
}

impl ErpForm for PurchaseOrderRow {
    const FORM_ID: &'static str = "PUR_PurchaseOrder";
    const FIELDS: &'static [FieldSpec] = &[
        field("bill_no", "FBillNo", Converter::Str),
        field("mto_no", "FMtoNo", Converter::Str),
        field("material_code", "FMaterialId.FNumber", Converter::Str),
        field("material_name", "FMaterialName", Converter::Str),
        field("specification", "FSpecification", Converter::Str),
        field("aux_id", "FAuxPropId", Converter::Int),
        field("aux_text", "FAuxPropId.FDataValue", Converter::Str),
        field("qty", "FQty", Converter::Decimal),
        field("remain_receive_qty", "FRemainReceiveQty", Converter::Decimal),
    ];

    fn from_row(row: &RowValues) -> Self {
        Self {
            bill_no: row.str("bill_no"),
            mto_no: row.str("mto_no"),
            material_code: row.str("material_code"),
            material_name: row.str("material_name"),
            specification: row.str("specification"),
            aux_id: row.int("aux_id"),
            aux_text: row.str("aux_text"),
            qty: row.dec("qty"),
            remain_receive_qty: row.dec("remain_receive_qty"),
        }
    }
}

impl MtoKeyed for PurchaseOrderRow {
    const MTO_MATCH: MtoMatch = MtoMatch {
        fields: &["FMtoNo"],
        prefix: false,
    };
}

/// Inbound stock receipt (`STK_InStock`). One physical form shared by
/// purchased and subcontracted receipts; the bill-type code tells them
/// apart.
#[derive(Debug, Clone)]
pub struct PurchaseReceiptRow {
    pub bill_no: String,
    pub mto_no: String,
    pub material_code: String,
    pub bill_type: String,
    pub real_qty: Decimal,
}

impl ErpForm for PurchaseReceiptRow {
    const FORM_ID: &'static str = "STK_InStock";
    const FIELDS: &'static [FieldSpec] = &[
        field("bill_no", "FBillNo", Converter::Str),
        field("mto_no", "FMtoNo", Converter::Str),
        field("material_code", "FMaterialId.FNumber", Converter::Str),
        field("bill_type", "FBillTypeID.FNumber", Converter::Str),
        field("real_qty", "FRealQty", Converter::Decimal),
    ];

    fn from_row(row: &RowValues) -> Self {
        Self {
            bill_no: row.str("bill_no"),
            mto_no: row.str("mto_no"),
            material_code: row.str("material_code"),
            bill_type: row.str("bill_type"),
            real_qty: row.dec("real_qty"),
        }
    }
}

impl MtoKeyed for PurchaseReceiptRow {
    const MTO_MATCH: MtoMatch = MtoMatch {
        fields: &["FMtoNo"],
        prefix: false,
    };
}

/// Subcontracting requisition order (`SUB_SUBREQORDER`). Not every
/// deployment installs the subcontracting module; the reader degrades this
/// form to zero rows when the ERP reports it missing.
#[derive(Debug, Clone)]
pub struct SubcontractOrderRow {
    pub bill_no: String,
    pub mto_no: String,
    pub material_code: String,
    pub material_name: String,
    pub specification: String,
    pub qty: Decimal,
    pub remain_receive_qty: Decimal,
}

impl ErpForm for SubcontractOrderRow {
    const FORM_ID: &'static str = "SUB_SUBREQORDER";
    const FIELDS: &'static [FieldSpec] = &[
        field("bill_no", "FBillNo", Converter::Str),
        field("mto_no", "FMtoNo", Converter::Str),
        field("material_code", "FMaterialId.FNumber", Converter::Str),
        field("material_name", "FMaterialName", Converter::Str),
        field("specification", "FSpecification", Converter::Str),
        field("qty", "FQty", Converter::Decimal),
        field("remain_receive_qty", "FRemainReceiveQty", Converter::Decimal),
    ];

    fn from_row(row: &RowValues) -> Self {
        Self {
            bill_no: row.str("bill_no"),
            mto_no: row.str("mto_no"),
            material_code: row.str("material_code"),
            material_name: row.str("material_name"),
            specification: row.str("specification"),
            qty: row.dec("qty"),
            remain_receive_qty: row.dec("remain_receive_qty"),
        }
    }
}

impl MtoKeyed for SubcontractOrderRow {
    const MTO_MATCH: MtoMatch = MtoMatch {
        fields: &["FMtoNo"],
        prefix: false,
    };
}

/// Material picking (`PRD_PickMtrl`): requested vs actually issued.
#[derive(Debug, Clone)]
pub struct PickingRow {
    pub bill_no: String,
    pub mto_no: String,
    pub material_code: String,
    pub app_qty: Decimal,
    pub actual_qty: Decimal,
}

impl ErpForm for PickingRow {
    const FORM_ID: &'static str = "PRD_PickMtrl";
    const FIELDS: &'static [FieldSpec] = &[
        field("bill_no", "FBillNo", Converter::Str),
        field("mto_no", "FMtoNo", Converter::Str),
        field("material_code", "FMaterialId.FNumber", Converter::Str),
        field("app_qty", "FAppQty", Converter::Decimal),
        field("actual_qty", "FActualQty", Converter::Decimal),
    ];

    fn from_row(row: &RowValues) -> Self {
        Self {
            bill_no: row.str("bill_no"),
            mto_no: row.str("mto_no"),
            material_code: row.str("material_code"),
            app_qty: row.dec("app_qty"),
            actual_qty: row.dec("actual_qty"),
        }
    }
}

impl MtoKeyed for PickingRow {
    const MTO_MATCH: MtoMatch = MtoMatch {
        fields: &["FMtoNo"],
        prefix: false,
    };
}

/// Sales delivery (`SAL_OUTSTOCK`).
#[derive(Debug, Clone)]
pub struct DeliveryRow {
    pub bill_no: String,
    pub mto_no: String,
    pub material_code: String,
    pub real_qty: Decimal,
}

impl ErpForm for DeliveryRow {
    const FORM_ID: &'static str = "SAL_OUTSTOCK";
    const FIELDS: &'static [FieldSpec] = &[
        field("bill_no", "FBillNo", Converter::Str),
        field("mto_no", "FMtoNo", Converter::Str),
        field("material_code", "FMaterialId.FNumber", Converter::Str),
        field("real_qty", "FRealQty", Converter::Decimal),
    ];

    fn from_row(row: &RowValues) -> Self {
        Self {
            bill_no: row.str("bill_no"),
            mto_no: row.str("mto_no"),
            material_code: row.str("material_code"),
            real_qty: row.dec("real_qty"),
        }
    }
}

impl MtoKeyed for DeliveryRow {
    const MTO_MATCH: MtoMatch = MtoMatch {
        fields: &["FMtoNo"],
        prefix: false,
    };
}

/// Variant-description lookup (`BD_FLEXSITEMDETAILV`), queried by id rather
/// than MTO.
#[derive(Debug, Clone)]
pub struct AuxPropertyRow {
    pub id: i64,
    pub data_value: String,
    pub name: String,
}

impl ErpForm for AuxPropertyRow {
    const FORM_ID: &'static str = "BD_FLEXSITEMDETAILV";
    const FIELDS: &'static [FieldSpec] = &[
        field("id", "FID", Converter::Int),
        field("data_value", "FDataValue", Converter::Str),
        field("name", "FName", Converter::Str),
    ];

    fn from_row(row: &RowValues) -> Self {
        Self {
            id: row.int("id"),
            data_value: row.str("data_value"),
            name: row.str("name"),
        }
    }
}
