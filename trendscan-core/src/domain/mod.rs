//! Domain types for TrendScan

pub mod bar;
pub mod position;

pub use bar::{Bar, BarStore};
pub use position::{Lot, Position};

/// Symbol type alias
pub type Symbol = String;
