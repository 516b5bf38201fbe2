use crate::error::{EngineError, EngineResult};
use crate::models::{Projection, WeeklySavings};

/// kg CO2 one tree absorbs in a year.
pub const TREE_KG_PER_YEAR: f64 = 21.0;
/// kg CO2 of one short-haul flight.
pub const SHORT_HAUL_FLIGHT_KG: f64 = 250.0;

pub const MEALS_PER_WEEK: std::ops::RangeInclusive<u32> = 1..=21;
pub const WEEKS: std::ops::RangeInclusive<u32> = 4..=104;

/// Cumulative savings from swapping `meals_per_week` meals for `weeks` weeks.
pub fn project_savings(
    current_meal_kg: f64,
    new_meal_kg: f64,
    meals_per_week: u32,
    weeks: u32,
) -> EngineResult<Projection> {
    if !(current_meal_kg.is_finite() && current_meal_kg >= 0.0) {
        return Err(EngineError::InvalidProjection(format!(
            "current meal emission must be non-negative (got {current_meal_kg})"
        )));
    }
    if !(new_meal_kg.is_finite() && new_meal_kg >= 0.0) {
        return Err(EngineError::InvalidProjection(format!(
            "new meal emission must be non-negative (got {new_meal_kg})"
        )));
    }
    if !MEALS_PER_WEEK.contains(&meals_per_week) {
        return Err(EngineError::InvalidProjection(format!(
            "meals per week must be between 1 and 21 (got {meals_per_week})"
        )));
    }
    if !WEEKS.contains(&weeks) {
        return Err(EngineError::InvalidProjection(format!(
            "weeks must be between 4 and 104 (got {weeks})"
        )));
    }

    let saved_per_meal_kg = current_meal_kg - new_meal_kg;
    let weekly_savings_kg = saved_per_meal_kg * f64::from(meals_per_week);
    let weeks: Vec<WeeklySavings> = (1..=weeks)
        .map(|week| WeeklySavings {
            week,
            cumulative_kg: weekly_savings_kg * f64::from(week),
        })
        .collect();
    let total_saved_kg = weeks.last().map_or(0.0, |w| w.cumulative_kg);

    Ok(Projection {
        saved_per_meal_kg,
        weekly_savings_kg,
        weeks,
        total_saved_kg,
        trees_offset: total_saved_kg / TREE_KG_PER_YEAR,
        flights_avoided: total_saved_kg / SHORT_HAUL_FLIGHT_KG,
    })
}
