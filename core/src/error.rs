use thiserror::Error;

/// Failures surfaced by the footprint engine.
///
/// Lookup failures inside the emission calculator are the one exception: they
/// degrade to a zero footprint instead of reaching the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Unknown unit '{0}'")]
    UnknownUnit(String),

    #[error("Ingredient '{0}' not found")]
    IngredientNotFound(String),

    #[error("No emission factor recorded for '{0}'")]
    MissingEmissionFactor(String),

    #[error("No nutrient profile for '{0}'")]
    ProfileNotFound(String),

    #[error("'{candidate}' does not have a lower emission factor than '{original}'")]
    NoImprovingAlternative { original: String, candidate: String },

    #[error("No candidate at position {attempt} in '{category}' ({available} available)")]
    ExhaustedCandidates {
        category: String,
        attempt: usize,
        available: usize,
    },

    #[error("No eligible substitution category for '{0}'")]
    CategoryIneligible(String),

    #[error("Amount must be a non-negative number (got {0})")]
    InvalidAmount(f64),

    #[error("Recipe line {index} does not exist (recipe has {len} lines)")]
    LineOutOfRange { index: usize, len: usize },

    #[error(
        "Substitution emits {new_kg:.3} kg, not less than the {current_kg:.3} kg it would replace"
    )]
    SubstitutionNotImproving { current_kg: f64, new_kg: f64 },

    #[error("Invalid projection: {0}")]
    InvalidProjection(String),
}

impl EngineError {
    /// True for the "nothing to recommend" family of outcomes, which callers
    /// usually report as a soft miss rather than a failure.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::IngredientNotFound(_)
                | Self::ProfileNotFound(_)
                | Self::NoImprovingAlternative { .. }
                | Self::ExhaustedCandidates { .. }
                | Self::CategoryIneligible(_)
        )
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
