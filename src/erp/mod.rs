//! Wire-level access to the source ERP: the bill-query client and the
//! filter-expression builder it consumes.

pub mod client;
pub mod filter;

pub use client::{ErpClient, ErpClientConfig, ErpError, FORM_NOT_FOUND_CODE};
pub use filter::FilterExpr;
