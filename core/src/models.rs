use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

// --- Reference data rows ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientRecord {
    pub description: String,
    pub food_group: String,
    /// kg CO2e per kg of food
    pub emission_factor: Option<f64>,
}

/// Nutrient content per 100 g, as published in the Canadian Nutrient File.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrients {
    pub alcohol: Option<f64>,
    pub caffeine: Option<f64>,
    pub calcium: Option<f64>,
    pub carbohydrate: Option<f64>,
    pub cholesterol: Option<f64>,
    pub lipid: Option<f64>,
    pub polyunsaturated_fat: Option<f64>,
    pub saturated_fat: Option<f64>,
    pub iron: Option<f64>,
    pub lactose: Option<f64>,
}

impl Nutrients {
    pub const FIELD_COUNT: usize = 10;

    /// Feature vector in a fixed order. Missing values count as 0.0.
    #[must_use]
    pub fn to_vector(&self) -> [f64; Self::FIELD_COUNT] {
        [
            self.alcohol,
            self.caffeine,
            self.calcium,
            self.carbohydrate,
            self.cholesterol,
            self.lipid,
            self.polyunsaturated_fat,
            self.saturated_fat,
            self.iron,
            self.lactose,
        ]
        .map(|v| v.unwrap_or(0.0))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NutrientProfile {
    pub description: String,
    pub food_group: String,
    pub nutrients: Nutrients,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitConversionRow {
    pub unit: String,
    pub grams_per_unit: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryFootprintRow {
    pub label: String,
    /// Aggregate kg CO2e per kg for the whole category
    pub emission_per_kg: f64,
}

/// Unit table used when no conversion table is supplied.
/// Volume units assume water density (1 ml = 1 g).
pub const DEFAULT_UNITS: &[(&str, f64)] = &[
    ("g", 1.0),
    ("kg", 1000.0),
    ("lb", 454.0),
    ("oz", 28.35),
    ("tbsp", 15.0),
    ("tsp", 5.0),
    ("ml", 1.0),
    ("l", 1000.0),
];

#[must_use]
pub fn default_unit_rows() -> Vec<UnitConversionRow> {
    DEFAULT_UNITS
        .iter()
        .map(|&(unit, grams_per_unit)| UnitConversionRow {
            unit: unit.to_string(),
            grams_per_unit,
        })
        .collect()
}

/// Key used for every description lookup: trimmed and case-folded.
#[must_use]
pub fn normalize_description(description: &str) -> String {
    description.trim().to_lowercase()
}

pub fn validate_amount(amount: f64) -> EngineResult<f64> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(amount)
    } else {
        Err(EngineError::InvalidAmount(amount))
    }
}

// --- Baseline ---

/// Per-meal CO2e threshold used to classify a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub kg: f64,
}

/// 2015 household GHG emissions from food products (kilotonnes CO2e).
const FOOD_PRODUCTS_KT: f64 = 31_368.0;
/// 2015 household GHG emissions from food services (kilotonnes CO2e).
const FOOD_SERVICES_KT: f64 = 12_577.0;
const HOUSEHOLDS_MILLIONS: f64 = 15.3;
const MEMBERS_PER_HOUSEHOLD: f64 = 3.0;

impl Baseline {
    #[must_use]
    pub fn new(kg: f64) -> Self {
        Self { kg }
    }

    /// Yearly household food emissions spread over days and household members,
    /// giving kilograms per person per meal slot.
    #[must_use]
    pub fn national_default() -> Self {
        let kg_per_household = (FOOD_PRODUCTS_KT + FOOD_SERVICES_KT) * 1_000_000_000.0
            / (HOUSEHOLDS_MILLIONS * 1_000_000.0);
        Self {
            kg: kg_per_household / 365.0 / MEMBERS_PER_HOUSEHOLD / 1000.0,
        }
    }

    #[must_use]
    pub fn medium_floor(&self) -> f64 {
        self.kg * 0.5
    }
}

impl Default for Baseline {
    fn default() -> Self {
        Self::national_default()
    }
}

// --- Session data ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeLine {
    pub category: String,
    pub description: String,
    pub amount: f64,
    pub unit: String,
    pub emission_kg: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub lines: Vec<RecipeLine>,
    /// Total captured just before the first substitution since the last direct edit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_total_kg: Option<f64>,
}

impl Recipe {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn total_emission_kg(&self) -> f64 {
        self.lines.iter().map(|l| l.emission_kg).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, index: usize) -> EngineResult<&RecipeLine> {
        self.lines.get(index).ok_or(EngineError::LineOutOfRange {
            index,
            len: self.lines.len(),
        })
    }
}

// --- Engine outputs ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLabel {
    LowImpact,
    MediumImpact,
    HighImpact,
}

impl ImpactLabel {
    /// Whether the UI should offer an alternative recipe.
    #[must_use]
    pub fn suggests_alternative(self) -> bool {
        !matches!(self, Self::LowImpact)
    }
}

impl std::fmt::Display for ImpactLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::LowImpact => "Low Impact",
            Self::MediumImpact => "Medium Impact",
            Self::HighImpact => "High Impact",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub total_kg: f64,
    pub label: ImpactLabel,
    pub baseline_kg: f64,
    /// `baseline_kg - total_kg`; negative when over the baseline
    pub delta_kg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Equivalences {
    pub kg_co2: f64,
    pub vehicle_km: f64,
    pub trees: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub description: String,
    pub food_group: String,
    /// Zero-based position in the distance ranking
    pub rank: usize,
    pub distance: f64,
    pub emission_factor: f64,
    pub original_emission_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub description: String,
    pub food_group: String,
    pub distance: f64,
    pub emission_factor: Option<f64>,
    pub improves: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub line: usize,
    pub original: String,
    pub category: String,
    pub eligible_categories: Vec<String>,
    pub attempt: usize,
    pub alternative: Alternative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalOutcome {
    Reduced,
    NotReduced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizedRecipe {
    pub generated_at: String,
    pub lines: Vec<RecipeLine>,
    pub total_kg: f64,
    pub original_total_kg: f64,
    pub reduced_kg: f64,
    pub outcome: FinalOutcome,
    pub equivalences: Equivalences,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeeklySavings {
    pub week: u32,
    pub cumulative_kg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub saved_per_meal_kg: f64,
    pub weekly_savings_kg: f64,
    pub weeks: Vec<WeeklySavings>,
    pub total_saved_kg: f64,
    pub trees_offset: f64,
    pub flights_avoided: f64,
}
