pub mod mto;

pub use crate::AppState;
