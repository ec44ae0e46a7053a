//! Bill-of-material aggregation.
//!
//! The same logical BOM requirement can surface as several raw rows (one
//! per contributing production order, or duplicated across filter paths).
//! Rows collapse on (material_code, variant text, MTO): the three core
//! quantities are summed, while non-quantity metadata is taken from the
//! most recent contributing row. The accumulator keeps those two groups in
//! separate fields so the sum-vs-passthrough policy is enforced by the type
//! rather than by convention.

use rust_decimal::Decimal;

use crate::sources::forms::BomLineRow;

/// The three summed BOM quantities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummedQtys {
    pub need: Decimal,
    pub picked: Decimal,
    pub unpicked: Decimal,
}

impl SummedQtys {
    pub fn add_line(&mut self, row: &BomLineRow) {
        self.need += row.need_qty;
        self.picked += row.picked_qty;
        self.unpicked += row.unpicked_qty;
    }

    pub fn merge(&mut self, other: &SummedQtys) {
        self.need += other.need;
        self.picked += other.picked;
        self.unpicked += other.unpicked;
    }
}

/// One aggregated BOM entry. Exposes the raw row's read surface plus the
/// summed quantities.
#[derive(Debug, Clone)]
pub struct BomRollup {
    pub qty: SummedQtys,
    latest: BomLineRow,
}

impl BomRollup {
    fn new(row: BomLineRow) -> Self {
        let mut qty = SummedQtys::default();
        qty.add_line(&row);
        Self { qty, latest: row }
    }

    fn absorb(&mut self, row: BomLineRow) {
        self.qty.add_line(&row);
        self.latest = row;
    }

    pub fn material_code(&self) -> &str {
        &self.latest.material_code
    }

    pub fn material_name(&self) -> &str {
        &self.latest.material_name
    }

    pub fn specification(&self) -> &str {
        &self.latest.specification
    }

    pub fn aux_id(&self) -> i64 {
        self.latest.aux_id
    }

    pub fn aux_text(&self) -> &str {
        &self.latest.aux_text
    }

    pub fn mto_no(&self) -> &str {
        &self.latest.mto_no
    }

    pub fn material_type_flag(&self) -> i64 {
        self.latest.material_type_flag
    }

    /// Latest contributing row, for callers that need further metadata.
    pub fn latest(&self) -> &BomLineRow {
        &self.latest
    }
}

/// Collapse raw BOM rows into one entry per (material_code, variant text,
/// MTO). First-seen order is preserved so output is deterministic.
pub fn aggregate(rows: Vec<BomLineRow>) -> Vec<BomRollup> {
    let mut index: std::collections::HashMap<(String, String, String), usize> =
        std::collections::HashMap::new();
    let mut rollups: Vec<BomRollup> = Vec::new();

    for row in rows {
        let key = (
            row.material_code.clone(),
            row.aux_text.clone(),
            row.mto_no.clone(),
        );
        match index.get(&key) {
            Some(&at) => rollups[at].absorb(row),
            None => {
                index.insert(key, rollups.len());
                rollups.push(BomRollup::new(row));
            }
        }
    }
    rollups
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(code: &str, aux_text: &str, need: Decimal, picked: Decimal, unpicked: Decimal) -> BomLineRow {
        BomLineRow {
            bill_no: "PPBOM001".into(),
            mo_bill_no: "MO0001".into(),
            mto_no: "AK2510034".into(),
            material_code: code.into(),
            material_name: format!("material {code}"),
            specification: String::new(),
            material_type_flag: 1,
            aux_id: 0,
            aux_text: aux_text.into(),
            need_qty: need,
            picked_qty: picked,
            unpicked_qty: unpicked,
        }
    }

    #[test]
    fn sums_quantities_across_rows_sharing_a_key() {
        let rollups = aggregate(vec![
            line("05.01.001", "", dec!(10), dec!(1), dec!(9)),
            line("05.01.001", "", dec!(20), dec!(2), dec!(18)),
            line("05.01.001", "", dec!(5), dec!(3), dec!(2)),
        ]);
        assert_eq!(rollups.len(), 1);
        assert_eq!(rollups[0].qty.need, dec!(35));
        assert_eq!(rollups[0].qty.picked, dec!(6));
        assert_eq!(rollups[0].qty.unpicked, dec!(29));
    }

    #[test]
    fn distinct_variant_text_stays_separate() {
        let rollups = aggregate(vec![
            line("08.02.100", "Red", dec!(10), dec!(0), dec!(10)),
            line("08.02.100", "Blue", dec!(4), dec!(0), dec!(4)),
        ]);
        assert_eq!(rollups.len(), 2);
        assert_eq!(rollups[0].aux_text(), "Red");
        assert_eq!(rollups[1].aux_text(), "Blue");
    }

    #[test]
    fn metadata_comes_from_latest_row_while_quantities_sum() {
        let mut first = line("05.01.001", "", dec!(10), dec!(0), dec!(10));
        first.material_name = "old name".into();
        let mut second = line("05.01.001", "", dec!(5), dec!(0), dec!(5));
        second.material_name = "new name".into();

        let rollups = aggregate(vec![first, second]);
        assert_eq!(rollups.len(), 1);
        assert_eq!(rollups[0].material_name(), "new name");
        assert_eq!(rollups[0].qty.need, dec!(15));
    }

    #[test]
    fn different_mto_suffixes_do_not_merge() {
        let mut a = line("05.01.001", "", dec!(10), dec!(0), dec!(10));
        let mut b = line("05.01.001", "", dec!(7), dec!(0), dec!(7));
        a.mto_no = "AK2510034-1".into();
        b.mto_no = "AK2510034-2".into();
        assert_eq!(aggregate(vec![a, b]).len(), 2);
    }
}
