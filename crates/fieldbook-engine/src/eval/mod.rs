mod evaluator;

pub(crate) use evaluator::{shift_date_value, values_equal};
pub use evaluator::{evaluate, Evaluator, FieldResolver};
