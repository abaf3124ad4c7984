#![forbid(unsafe_code)]

//! Shared vocabulary for computed table fields.
//!
//! This crate holds the field-configuration types exchanged between a host
//! application (tables, records, persistence) and the formula engine in
//! `fieldbook-engine`. It deliberately contains no behavior beyond identity
//! and a few convenience accessors.

mod fields;

pub use fields::{FieldId, FormulaFieldConfig, ResultType, RollupFieldConfig};
