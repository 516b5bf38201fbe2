use crate::models::{Baseline, Evaluation, ImpactLabel, Recipe};

/// Classify a total against the baseline. Exactly half the baseline is still Medium.
#[must_use]
pub fn classify(total_kg: f64, baseline: Baseline) -> ImpactLabel {
    if total_kg > baseline.kg {
        ImpactLabel::HighImpact
    } else if total_kg >= baseline.medium_floor() {
        ImpactLabel::MediumImpact
    } else {
        ImpactLabel::LowImpact
    }
}

#[must_use]
pub fn evaluate(recipe: &Recipe, baseline: Baseline) -> Evaluation {
    let total_kg = recipe.total_emission_kg();
    Evaluation {
        total_kg,
        label: classify(total_kg, baseline),
        baseline_kg: baseline.kg,
        delta_kg: baseline.kg - total_kg,
    }
}
