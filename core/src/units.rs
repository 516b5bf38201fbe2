use crate::error::{EngineError, EngineResult};
use crate::reference::ReferenceData;

/// Convert `amount` of `unit` to grams using the reference unit table.
pub fn convert(data: &ReferenceData, amount: f64, unit: &str) -> EngineResult<f64> {
    let row = data
        .unit(unit)
        .ok_or_else(|| EngineError::UnknownUnit(unit.to_string()))?;
    Ok(amount * row.grams_per_unit)
}
