use crate::error::{EngineError, EngineResult};
use crate::reference::ReferenceData;
use crate::units;

/// Emission factor (kg CO2e per kg) for an ingredient.
pub fn emission_factor(data: &ReferenceData, description: &str) -> EngineResult<f64> {
    let record = data
        .ingredient(description)
        .ok_or_else(|| EngineError::IngredientNotFound(description.trim().to_string()))?;
    record
        .emission_factor
        .ok_or_else(|| EngineError::MissingEmissionFactor(record.description.clone()))
}

/// Total emission in kilograms for a quantity of an ingredient.
///
/// An unknown ingredient or a missing emission factor counts as zero so that
/// building a recipe never stops on incomplete data. Unknown units still fail.
pub fn total_emission_kg(
    data: &ReferenceData,
    description: &str,
    amount: f64,
    unit: &str,
) -> EngineResult<f64> {
    let grams = units::convert(data, amount, unit)?;
    match emission_factor(data, description) {
        Ok(factor) => Ok(grams * factor / 1000.0),
        Err(err) => {
            tracing::warn!(%description, error = %err, "emission data unavailable, counting as zero");
            Ok(0.0)
        }
    }
}
