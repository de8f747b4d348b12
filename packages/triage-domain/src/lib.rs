//! Pure routing logic: input gating, multi-field scoring, department voting and the
//! auto-assign gate. Nothing in this crate performs I/O.

pub mod aggregation;
pub mod auto_assign;
pub mod scoring;
pub mod validation;
