//! Wire-value coercion.
//!
//! Every form declares an ordered list of `FieldSpec`s: semantic name, wire
//! field key and a converter. Raw rows come back positionally in the same
//! order the field keys were sent, so `RowValues` zips the two. Coercion
//! never fails: missing or malformed values take the converter's default
//! (empty string, zero, or `None`).

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converter {
    Str,
    OptStr,
    Decimal,
    Int,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub wire: &'static str,
    pub conv: Converter,
}

pub const fn field(name: &'static str, wire: &'static str, conv: Converter) -> FieldSpec {
    FieldSpec { name, wire, conv }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    OptStr(Option<String>),
    Decimal(Decimal),
    Int(i64),
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_decimal(value: &Value) -> Decimal {
    match value {
        // Going through the textual form keeps exact decimal digits instead
        // of round-tripping via f64.
        Value::Number(n) => Decimal::from_str(&n.to_string()).unwrap_or_default(),
        Value::String(s) => Decimal::from_str(s.trim()).unwrap_or_default(),
        _ => Decimal::ZERO,
    }
}

fn as_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn coerce(conv: Converter, value: Option<&Value>) -> FieldValue {
    match conv {
        Converter::Str => FieldValue::Str(
            value
                .and_then(as_string)
                .unwrap_or_default(),
        ),
        Converter::OptStr => FieldValue::OptStr(value.and_then(as_string).filter(|s| !s.is_empty())),
        Converter::Decimal => FieldValue::Decimal(value.map(as_decimal).unwrap_or_default()),
        Converter::Int => FieldValue::Int(value.map(as_int).unwrap_or(0)),
    }
}

/// One coerced row, keyed by semantic field name.
#[derive(Debug, Clone)]
pub struct RowValues {
    values: HashMap<&'static str, FieldValue>,
}

impl RowValues {
    /// Zip a positional raw row against the form's field specs. Short rows
    /// simply leave trailing fields at their defaults.
    pub fn from_raw(specs: &'static [FieldSpec], raw: &[Value]) -> Self {
        let mut values = HashMap::with_capacity(specs.len());
        for (idx, spec) in specs.iter().enumerate() {
            values.insert(spec.name, coerce(spec.conv, raw.get(idx)));
        }
        Self { values }
    }

    pub fn str(&self, name: &str) -> String {
        match self.values.get(name) {
            Some(FieldValue::Str(s)) => s.clone(),
            Some(FieldValue::OptStr(s)) => s.clone().unwrap_or_default(),
            _ => String::new(),
        }
    }

    pub fn opt_str(&self, name: &str) -> Option<String> {
        match self.values.get(name) {
            Some(FieldValue::OptStr(s)) => s.clone(),
            Some(FieldValue::Str(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }

    pub fn dec(&self, name: &str) -> Decimal {
        match self.values.get(name) {
            Some(FieldValue::Decimal(d)) => *d,
            _ => Decimal::ZERO,
        }
    }

    pub fn int(&self, name: &str) -> i64 {
        match self.values.get(name) {
            Some(FieldValue::Int(i)) => *i,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SPECS: &[FieldSpec] = &[
        field("bill_no", "FBillNo", Converter::Str),
        field("qty", "FQty", Converter::Decimal),
        field("aux_id", "FAuxPropId", Converter::Int),
        field("note", "FNote", Converter::OptStr),
    ];

    #[test]
    fn coerces_typical_row() {
        let row = RowValues::from_raw(SPECS, &[json!("MO0001"), json!(12.5), json!(77), json!("x")]);
        assert_eq!(row.str("bill_no"), "MO0001");
        assert_eq!(row.dec("qty").to_string(), "12.5");
        assert_eq!(row.int("aux_id"), 77);
        assert_eq!(row.opt_str("note").as_deref(), Some("x"));
    }

    #[test]
    fn decimal_strings_keep_exact_digits() {
        let row = RowValues::from_raw(SPECS, &[json!("x"), json!("0.125"), json!(0)]);
        assert_eq!(row.dec("qty").to_string(), "0.125");
    }

    #[test]
    fn nulls_and_short_rows_take_defaults() {
        let row = RowValues::from_raw(SPECS, &[json!(null)]);
        assert_eq!(row.str("bill_no"), "");
        assert_eq!(row.dec("qty"), Decimal::ZERO);
        assert_eq!(row.int("aux_id"), 0);
        assert_eq!(row.opt_str("note"), None);
    }

    #[test]
    fn malformed_values_never_panic() {
        let row = RowValues::from_raw(
            SPECS,
            &[json!(["nested"]), json!("not a number"), json!(true), json!("")],
        );
        assert_eq!(row.str("bill_no"), "");
        assert_eq!(row.dec("qty"), Decimal::ZERO);
        assert_eq!(row.int("aux_id"), 0);
        assert_eq!(row.opt_str("note"), None);
    }
}
