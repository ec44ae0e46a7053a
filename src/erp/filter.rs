//! Builder for the ERP's flat boolean filter syntax.
//!
//! The source system accepts expressions of the form
//! `FMtoNo='AK2510034' AND FBillTypeID.FNumber IN ('RKD01_SYS')` with
//! `LIKE 'prefix%'` for prefix matches. Values are single-quoted with
//! embedded quotes doubled.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    Eq(String, String),
    LikePrefix(String, String),
    InList(String, Vec<String>),
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
}

impl FilterExpr {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        FilterExpr::Eq(field.into(), value.into())
    }

    pub fn like_prefix(field: impl Into<String>, value: impl Into<String>) -> Self {
        FilterExpr::LikePrefix(field.into(), value.into())
    }

    pub fn in_list<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterExpr::InList(field.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn and(exprs: Vec<FilterExpr>) -> Self {
        FilterExpr::And(exprs)
    }

    pub fn or(exprs: Vec<FilterExpr>) -> Self {
        FilterExpr::Or(exprs)
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpr::Eq(field, value) => write!(f, "{}={}", field, quote(value)),
            FilterExpr::LikePrefix(field, value) => {
                write!(f, "{} LIKE '{}%'", field, value.replace('\'', "''"))
            }
            FilterExpr::InList(field, values) => {
                let quoted: Vec<String> = values.iter().map(|v| quote(v)).collect();
                write!(f, "{} IN ({})", field, quoted.join(","))
            }
            FilterExpr::And(exprs) => write_joined(f, exprs, " AND "),
            FilterExpr::Or(exprs) => write_joined(f, exprs, " OR "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, exprs: &[FilterExpr], sep: &str) -> fmt::Result {
    let rendered: Vec<String> = exprs
        .iter()
        .map(|e| match e {
            // Nested groups keep their own parentheses so AND/OR precedence
            // never depends on the source system's parser.
            FilterExpr::And(_) | FilterExpr::Or(_) => format!("({})", e),
            _ => e.to_string(),
        })
        .collect();
    write!(f, "{}", rendered.join(sep))
}
