use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;

use crate::aggregate;
use crate::eligibility;
use crate::emission;
use crate::equivalence;
use crate::error::{EngineError, EngineResult};
use crate::matcher;
use crate::models::{
    Alternative, Baseline, Equivalences, Evaluation, FinalOutcome, FinalizedRecipe,
    Projection, RankedCandidate, Recipe, RecipeLine, Suggestion, validate_amount,
};
use crate::projection;
use crate::reference::ReferenceData;
use crate::units;

/// Destination for finalized recipes.
///
/// The web app mails the report; the CLI writes it to a file. Called
/// synchronously once the recipe is finalized.
pub trait ReportSink {
    fn deliver(&self, report: &FinalizedRecipe) -> Result<()>;
}

/// Footprint engine over one immutable dataset snapshot.
///
/// The service never owns a recipe: each session keeps its own `Recipe` and
/// passes it in, so one service can back any number of sessions.
pub struct FootprintService {
    data: ReferenceData,
    baseline: Baseline,
}

impl FootprintService {
    #[must_use]
    pub fn new(data: ReferenceData, baseline: Baseline) -> Self {
        Self { data, baseline }
    }

    pub fn from_dir(dir: &Path, baseline: Baseline) -> Result<Self> {
        Ok(Self::new(ReferenceData::load_dir(dir)?, baseline))
    }

    #[must_use]
    pub fn data(&self) -> &ReferenceData {
        &self.data
    }

    #[must_use]
    pub fn baseline(&self) -> Baseline {
        self.baseline
    }

    // --- Lookups ---

    pub fn convert(&self, amount: f64, unit: &str) -> EngineResult<f64> {
        units::convert(&self.data, amount, unit)
    }

    pub fn total_emission_kg(&self, description: &str, amount: f64, unit: &str) -> EngineResult<f64> {
        emission::total_emission_kg(&self.data, description, amount, unit)
    }

    // --- Recipe editing ---

    /// Append a line. An empty `category` takes the ingredient's own food group.
    pub fn add_line(
        &self,
        recipe: &mut Recipe,
        category: &str,
        description: &str,
        amount: f64,
        unit: &str,
    ) -> EngineResult<RecipeLine> {
        let line = self.build_line(category, description, amount, unit)?;
        recipe.lines.push(line.clone());
        recipe.original_total_kg = None;
        Ok(line)
    }

    /// Remove every listed line. Nothing is removed if any index is out of range.
    pub fn remove_lines(&self, recipe: &mut Recipe, indices: &[usize]) -> EngineResult<usize> {
        let len = recipe.lines.len();
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(EngineError::LineOutOfRange { index, len });
        }
        let doomed: BTreeSet<usize> = indices.iter().copied().collect();
        let mut position = 0;
        recipe.lines.retain(|_| {
            let keep = !doomed.contains(&position);
            position += 1;
            keep
        });
        if !doomed.is_empty() {
            recipe.original_total_kg = None;
        }
        Ok(doomed.len())
    }

    pub fn reset_recipe(&self, recipe: &mut Recipe) {
        *recipe = Recipe::new();
    }

    #[must_use]
    pub fn evaluate_recipe(&self, recipe: &Recipe) -> Evaluation {
        aggregate::evaluate(recipe, self.baseline)
    }

    // --- Substitution ---

    #[must_use]
    pub fn eligible_categories(&self, description: &str) -> Vec<String> {
        eligibility::eligible_categories(&self.data, description)
    }

    pub fn closest_alternative(
        &self,
        category: &str,
        description: &str,
        attempt: usize,
    ) -> EngineResult<Alternative> {
        matcher::closest_alternative(&self.data, category, description, attempt)
    }

    pub fn ranked_candidates(
        &self,
        category: &str,
        description: &str,
    ) -> EngineResult<Vec<RankedCandidate>> {
        matcher::ranked_candidates(&self.data, category, description)
    }

    /// Suggest a substitute for one recipe line, searching `category` or, when
    /// none is given, the first eligible category.
    pub fn suggest_for_line(
        &self,
        recipe: &Recipe,
        line: usize,
        category: Option<&str>,
        attempt: usize,
    ) -> EngineResult<Suggestion> {
        let original = recipe.line(line)?.description.clone();
        let eligible = self.eligible_categories(&original);

        let category = match category {
            Some(requested) if eligible.iter().any(|c| c == requested) => requested.to_string(),
            Some(_) => return Err(EngineError::CategoryIneligible(original)),
            None => eligible
                .first()
                .cloned()
                .ok_or_else(|| EngineError::CategoryIneligible(original.clone()))?,
        };

        let alternative = self.closest_alternative(&category, &original, attempt)?;
        Ok(Suggestion {
            line,
            original,
            category,
            eligible_categories: eligible,
            attempt,
            alternative,
        })
    }

    /// Replace a line with another ingredient. The replacement must be in the
    /// ingredient table with an emission factor, and the new line must be a
    /// real reduction; the recipe is left untouched on any error.
    pub fn apply_substitution(
        &self,
        recipe: &mut Recipe,
        line: usize,
        description: &str,
        amount: f64,
        unit: &str,
    ) -> EngineResult<RecipeLine> {
        let current = recipe.line(line)?;
        if amount <= 0.0 {
            return Err(EngineError::InvalidAmount(amount));
        }
        // Unknown replacements would otherwise count as zero and always "improve"
        emission::emission_factor(&self.data, description)?;
        let replacement = self.build_line("", description, amount, unit)?;
        if replacement.emission_kg >= current.emission_kg {
            return Err(EngineError::SubstitutionNotImproving {
                current_kg: current.emission_kg,
                new_kg: replacement.emission_kg,
            });
        }

        if recipe.original_total_kg.is_none() {
            recipe.original_total_kg = Some(recipe.total_emission_kg());
        }
        recipe.lines[line] = replacement.clone();
        tracing::info!(line, %description, emission_kg = replacement.emission_kg, "substitution applied");
        Ok(replacement)
    }

    // --- Reporting ---

    #[must_use]
    pub fn equivalences(&self, kg_co2: f64) -> Equivalences {
        equivalence::equivalences(kg_co2)
    }

    /// Compare the recipe with its total before the first substitution.
    #[must_use]
    pub fn finalize(&self, recipe: &Recipe) -> FinalizedRecipe {
        let total_kg = recipe.total_emission_kg();
        let original_total_kg = recipe.original_total_kg.unwrap_or(total_kg);
        let reduced_kg = original_total_kg - total_kg;
        let outcome = if total_kg < original_total_kg {
            FinalOutcome::Reduced
        } else {
            FinalOutcome::NotReduced
        };
        FinalizedRecipe {
            generated_at: chrono::Local::now().to_rfc3339(),
            lines: recipe.lines.clone(),
            total_kg,
            original_total_kg,
            reduced_kg,
            outcome,
            equivalences: equivalence::equivalences(reduced_kg),
        }
    }

    pub fn deliver(&self, sink: &dyn ReportSink, report: &FinalizedRecipe) -> Result<()> {
        sink.deliver(report)
    }

    pub fn project_savings(
        &self,
        current_meal_kg: f64,
        new_meal_kg: f64,
        meals_per_week: u32,
        weeks: u32,
    ) -> EngineResult<Projection> {
        projection::project_savings(current_meal_kg, new_meal_kg, meals_per_week, weeks)
    }

    fn build_line(
        &self,
        category: &str,
        description: &str,
        amount: f64,
        unit: &str,
    ) -> EngineResult<RecipeLine> {
        let amount = validate_amount(amount)?;
        let emission_kg = self.total_emission_kg(description, amount, unit)?;
        let record = self.data.ingredient(description);
        let category = if category.trim().is_empty() {
            record.map(|r| r.food_group.clone()).unwrap_or_default()
        } else {
            category.to_string()
        };
        let description = record.map_or_else(
            || description.trim().to_string(),
            |r| r.description.clone(),
        );
        Ok(RecipeLine {
            category,
            description,
            amount,
            unit: unit.to_string(),
            emission_kg,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::models::{ImpactLabel, IngredientRecord, default_unit_rows};
    use crate::reference::CategoryAliasMap;
    use crate::reference::fixtures::{fat_and_protein, ingredient, profile, sample_data};

    const PORK: &str = "Pork, back ribs, lean and fat, raw";

    fn service() -> FootprintService {
        FootprintService::new(sample_data(), Baseline::new(5.0))
    }

    struct MemorySink {
        delivered: RefCell<Vec<FinalizedRecipe>>,
    }

    impl ReportSink for MemorySink {
        fn deliver(&self, report: &FinalizedRecipe) -> Result<()> {
            self.delivered.borrow_mut().push(report.clone());
            Ok(())
        }
    }

    #[test]
    fn test_add_line() {
        let svc = service();
        let mut recipe = Recipe::new();
        let line = svc
            .add_line(&mut recipe, "", " tofu, FIRM", 500.0, "g")
            .unwrap();
        assert_eq!(line.description, "Tofu, firm");
        assert_eq!(line.category, "Legumes and Legume Products");
        assert!((line.emission_kg - 1.6).abs() < 1e-9);
        assert_eq!(recipe.len(), 1);
    }

    #[test]
    fn test_add_line_keeps_given_category() {
        let svc = service();
        let mut recipe = Recipe::new();
        let line = svc
            .add_line(&mut recipe, "Legumes", "Tofu, firm", 1.0, "kg")
            .unwrap();
        assert_eq!(line.category, "Legumes");
    }

    #[test]
    fn test_add_line_unknown_food_counts_zero() {
        let svc = service();
        let mut recipe = Recipe::new();
        let line = svc
            .add_line(&mut recipe, "Sweets", "Unknown Food", 100.0, "g")
            .unwrap();
        assert!(line.emission_kg.abs() < f64::EPSILON);
        assert_eq!(line.description, "Unknown Food");
        assert_eq!(recipe.len(), 1);
    }

    #[test]
    fn test_add_line_is_all_or_nothing() {
        let svc = service();
        let mut recipe = Recipe::new();
        assert_eq!(
            svc.add_line(&mut recipe, "", "Tofu, firm", 1.0, "cup")
                .unwrap_err(),
            EngineError::UnknownUnit("cup".to_string())
        );
        assert_eq!(
            svc.add_line(&mut recipe, "", "Tofu, firm", -1.0, "g")
                .unwrap_err(),
            EngineError::InvalidAmount(-1.0)
        );
        assert!(recipe.is_empty());
    }

    #[test]
    fn test_add_then_remove_restores_recipe() {
        let svc = service();
        let mut recipe = Recipe::new();
        svc.add_line(&mut recipe, "", "Tofu, firm", 200.0, "g").unwrap();
        svc.add_line(&mut recipe, "", PORK, 300.0, "g").unwrap();
        let before = recipe.clone();
        let total_before = svc.evaluate_recipe(&recipe).total_kg;

        svc.add_line(&mut recipe, "", "Cheese, cheddar", 50.0, "g").unwrap();
        let removed = svc.remove_lines(&mut recipe, &[2]).unwrap();

        assert_eq!(removed, 1);
        assert_eq!(recipe, before);
        assert!((svc.evaluate_recipe(&recipe).total_kg - total_before).abs() < 1e-12);
    }

    #[test]
    fn test_remove_lines_several_and_duplicates() {
        let svc = service();
        let mut recipe = Recipe::new();
        for desc in ["Tofu, firm", PORK, "Cheese, cheddar", "Peas, green, raw"] {
            svc.add_line(&mut recipe, "", desc, 100.0, "g").unwrap();
        }
        let removed = svc.remove_lines(&mut recipe, &[3, 0, 3]).unwrap();
        assert_eq!(removed, 2);
        let left: Vec<&str> = recipe.lines.iter().map(|l| l.description.as_str()).collect();
        assert_eq!(left, vec![PORK, "Cheese, cheddar"]);
    }

    #[test]
    fn test_remove_lines_out_of_range_removes_nothing() {
        let svc = service();
        let mut recipe = Recipe::new();
        svc.add_line(&mut recipe, "", "Tofu, firm", 100.0, "g").unwrap();
        let err = svc.remove_lines(&mut recipe, &[0, 5]).unwrap_err();
        assert_eq!(err, EngineError::LineOutOfRange { index: 5, len: 1 });
        assert_eq!(recipe.len(), 1);
    }

    #[test]
    fn test_reset_recipe() {
        let svc = service();
        let mut recipe = Recipe::new();
        svc.add_line(&mut recipe, "", "Tofu, firm", 100.0, "g").unwrap();
        svc.reset_recipe(&mut recipe);
        assert!(recipe.is_empty());
        assert!(recipe.original_total_kg.is_none());
    }

    /// Baseline 5 kg: a 6 kg line is High; swapping it for a 2 kg line is Low.
    #[test]
    fn test_high_to_low_scenario() {
        let data = ReferenceData::new(
            vec![
                ingredient("Steak", "Beef Products", Some(30.0)),
                ingredient("Beans", "Legumes and Legume Products", Some(2.0)),
            ],
            vec![
                profile("Steak", "Beef Products", fat_and_protein(10.0, 10.0, 2.0)),
                profile("Beans", "Legumes and Legume Products", fat_and_protein(1.0, 40.0, 5.0)),
            ],
            default_unit_rows(),
            vec![crate::models::CategoryFootprintRow {
                label: "Legumes".to_string(),
                emission_per_kg: 0.9,
            }],
            CategoryAliasMap::default(),
        );
        let svc = FootprintService::new(data, Baseline::new(5.0));
        let mut recipe = Recipe::new();

        svc.add_line(&mut recipe, "", "Steak", 200.0, "g").unwrap();
        let eval = svc.evaluate_recipe(&recipe);
        assert!((eval.total_kg - 6.0).abs() < 1e-9);
        assert_eq!(eval.label, ImpactLabel::HighImpact);

        let suggestion = svc.suggest_for_line(&recipe, 0, None, 0).unwrap();
        assert_eq!(suggestion.category, "Legumes and Legume Products");
        assert_eq!(suggestion.alternative.description, "Beans");

        svc.apply_substitution(&mut recipe, 0, "Beans", 1.0, "kg").unwrap();
        let eval = svc.evaluate_recipe(&recipe);
        assert!((eval.total_kg - 2.0).abs() < 1e-9);
        assert_eq!(eval.label, ImpactLabel::LowImpact);

        let report = svc.finalize(&recipe);
        assert_eq!(report.outcome, FinalOutcome::Reduced);
        assert!((report.reduced_kg - 4.0).abs() < 1e-9);
        assert!((report.equivalences.vehicle_km - 6.153_846).abs() < 1e-6);
        assert_eq!(report.equivalences.trees, 59);
    }

    #[test]
    fn test_apply_substitution_rewrites_line() {
        let svc = service();
        let mut recipe = Recipe::new();
        svc.add_line(&mut recipe, "", PORK, 500.0, "g").unwrap();
        svc.add_line(&mut recipe, "", "Tofu, firm", 100.0, "g").unwrap();

        let line = svc
            .apply_substitution(&mut recipe, 0, "seeds, sunflower seed kernels", 200.0, "g")
            .unwrap();
        assert_eq!(line.description, "Seeds, sunflower seed kernels");
        assert_eq!(line.category, "Nuts and Seeds");
        assert!((line.emission_kg - 0.46).abs() < 1e-9);
        assert_eq!(recipe.lines[0], line);
        // 500 g pork (3.8) + 100 g tofu (0.32)
        assert!((recipe.original_total_kg.unwrap() - 4.12).abs() < 1e-9);
    }

    #[test]
    fn test_apply_substitution_rejects_without_mutating() {
        let svc = service();
        let mut recipe = Recipe::new();
        svc.add_line(&mut recipe, "", "Tofu, firm", 100.0, "g").unwrap();
        let before = recipe.clone();

        let err = svc
            .apply_substitution(&mut recipe, 0, "Cheese, cheddar", 100.0, "g")
            .unwrap_err();
        assert!(matches!(err, EngineError::SubstitutionNotImproving { .. }));
        assert_eq!(
            svc.apply_substitution(&mut recipe, 0, "Peas, green, raw", 0.0, "g")
                .unwrap_err(),
            EngineError::InvalidAmount(0.0)
        );
        assert_eq!(
            svc.apply_substitution(&mut recipe, 0, "Peas, green, raw", 1.0, "cup")
                .unwrap_err(),
            EngineError::UnknownUnit("cup".to_string())
        );
        assert_eq!(
            svc.apply_substitution(&mut recipe, 3, "Peas, green, raw", 1.0, "g")
                .unwrap_err(),
            EngineError::LineOutOfRange { index: 3, len: 1 }
        );
        assert_eq!(recipe, before);
    }

    #[test]
    fn test_apply_substitution_requires_emission_data() {
        let svc = service();
        let mut recipe = Recipe::new();
        svc.add_line(&mut recipe, "", PORK, 1.0, "kg").unwrap();
        let before = recipe.clone();

        assert_eq!(
            svc.apply_substitution(&mut recipe, 0, "tofu firm (typo)", 200.0, "g")
                .unwrap_err(),
            EngineError::IngredientNotFound("tofu firm (typo)".to_string())
        );
        assert_eq!(
            svc.apply_substitution(&mut recipe, 0, "Nuts, walnuts, English", 200.0, "g")
                .unwrap_err(),
            EngineError::MissingEmissionFactor("Nuts, walnuts, English".to_string())
        );
        assert_eq!(recipe, before);
        assert!(recipe.original_total_kg.is_none());
        assert_eq!(svc.finalize(&recipe).outcome, FinalOutcome::NotReduced);
    }

    #[test]
    fn test_original_total_survives_multiple_swaps() {
        let svc = service();
        let mut recipe = Recipe::new();
        svc.add_line(&mut recipe, "", PORK, 1.0, "kg").unwrap();
        svc.apply_substitution(&mut recipe, 0, "Tofu, firm", 1.0, "kg").unwrap();
        svc.apply_substitution(&mut recipe, 0, "Peas, green, raw", 1.0, "kg").unwrap();
        assert!((recipe.original_total_kg.unwrap() - 7.6).abs() < 1e-9);

        // A direct edit starts a new comparison
        svc.add_line(&mut recipe, "", "Tofu, firm", 1.0, "g").unwrap();
        assert!(recipe.original_total_kg.is_none());
    }

    #[test]
    fn test_suggest_for_line_category_checks() {
        let svc = service();
        let mut recipe = Recipe::new();
        svc.add_line(&mut recipe, "", PORK, 100.0, "g").unwrap();
        svc.add_line(&mut recipe, "", "Peas, green, raw", 100.0, "g").unwrap();

        let s = svc
            .suggest_for_line(&recipe, 0, Some("Nuts and Seeds"), 0)
            .unwrap();
        assert_eq!(s.alternative.description, "Seeds, sunflower seed kernels");
        assert_eq!(s.eligible_categories.len(), 4);

        assert_eq!(
            svc.suggest_for_line(&recipe, 0, Some("Beef Products"), 0)
                .unwrap_err(),
            EngineError::CategoryIneligible(PORK.to_string())
        );
        assert_eq!(
            svc.suggest_for_line(&recipe, 1, None, 0).unwrap_err(),
            EngineError::CategoryIneligible("Peas, green, raw".to_string())
        );
    }

    #[test]
    fn test_finalize_without_swaps_is_not_reduced() {
        let svc = service();
        let mut recipe = Recipe::new();
        svc.add_line(&mut recipe, "", "Tofu, firm", 100.0, "g").unwrap();
        let report = svc.finalize(&recipe);
        assert_eq!(report.outcome, FinalOutcome::NotReduced);
        assert!(report.reduced_kg.abs() < f64::EPSILON);
        assert_eq!(report.equivalences.trees, 0);
    }

    #[test]
    fn test_deliver_to_sink() {
        let svc = service();
        let sink = MemorySink {
            delivered: RefCell::new(Vec::new()),
        };
        let report = svc.finalize(&Recipe::new());
        svc.deliver(&sink, &report).unwrap();
        assert_eq!(sink.delivered.borrow().len(), 1);
    }

    #[test]
    fn test_search_without_filters_returns_everything() {
        let svc = service();
        let all: Vec<&IngredientRecord> = svc.data().search_ingredients(None, None);
        assert_eq!(all.len(), svc.data().ingredients().len());
    }
}
