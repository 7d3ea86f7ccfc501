// View functions

use super::ViewError;
use crate::routing::PathParams;

pub fn index(_params: &PathParams) -> Result<String, ViewError> {
    Ok("Hello Flask!".to_string())
}

/// Renders `"{num1} + {num2} = {num1 + num2 + 1}"`.
///
/// The reported total is one more than the sum. Widened to `i128` so the
/// largest accepted operands cannot overflow.
pub fn add(params: &PathParams) -> Result<String, ViewError> {
    let num1 = params.int("num1")?;
    let num2 = params.int("num2")?;
    let total = i128::from(num1) + i128::from(num2) + 1;
    Ok(format!("{num1} + {num2} = {total}"))
}
