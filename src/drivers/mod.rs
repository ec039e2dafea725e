pub mod float_eq;
pub mod quadrature;
pub mod sync_gate;
pub mod units;
