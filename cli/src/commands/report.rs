use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use ecoswap_core::models::{FinalOutcome, FinalizedRecipe};
use ecoswap_core::{FootprintService, ReportSink};

use super::helpers::{no_neg_zero, print_recipe_table};
use crate::session::SessionFile;

/// Writes finalized recipes as pretty JSON to a file.
pub(crate) struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub(crate) fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl ReportSink for JsonFileSink {
    fn deliver(&self, report: &FinalizedRecipe) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write report: {}", self.path.display()))?;
        tracing::info!(path = %self.path.display(), "report exported");
        Ok(())
    }
}

pub(crate) fn cmd_equivalences(svc: &FootprintService, kg: f64, json: bool) -> Result<()> {
    if !kg.is_finite() {
        bail!("Amount of CO2 must be a finite number");
    }
    let eq = svc.equivalences(kg);
    if json {
        println!("{}", serde_json::to_string_pretty(&eq)?);
        return Ok(());
    }
    let km = no_neg_zero(eq.vehicle_km);
    let trees = eq.trees;
    println!("{kg:.3} kg CO2e is about:");
    println!("  {km:.1} km driven in an average car");
    println!("  {trees} trees absorbing CO2 for a day");
    Ok(())
}

pub(crate) fn cmd_finalize(
    svc: &FootprintService,
    session: &SessionFile,
    export: Option<&Path>,
    json: bool,
) -> Result<()> {
    let recipe = session.load()?;
    if recipe.is_empty() {
        bail!("Recipe is empty; nothing to finalize");
    }
    let report = svc.finalize(&recipe);
    if let Some(path) = export {
        svc.deliver(&JsonFileSink::new(path), &report)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_recipe_table(&recipe);
    let total = no_neg_zero(report.total_kg);
    let original = report.original_total_kg;
    match report.outcome {
        FinalOutcome::Reduced => {
            let saved = report.reduced_kg;
            let km = report.equivalences.vehicle_km;
            let trees = report.equivalences.trees;
            println!("Final: {total:.3} kg CO2e (was {original:.3} kg)");
            println!("  You saved {saved:.3} kg: {km:.1} km of driving, or {trees} trees for a day");
        }
        FinalOutcome::NotReduced => {
            println!("Final: {total:.3} kg CO2e");
            println!("  No reduction yet. Try `ecoswap suggest <line>`");
        }
    }
    if let Some(path) = export {
        println!("Report written to {}", path.display());
    }
    Ok(())
}

pub(crate) fn cmd_project(
    svc: &FootprintService,
    session: &SessionFile,
    current_kg: Option<f64>,
    new_kg: Option<f64>,
    meals_per_week: u32,
    weeks: u32,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct WeekRow {
        #[tabled(rename = "Week")]
        week: u32,
        #[tabled(rename = "Saved (kg)")]
        saved: String,
    }

    // Without explicit figures, compare the session recipe with its pre-swap total
    let (current, new) = match (current_kg, new_kg) {
        (Some(c), Some(n)) => (c, n),
        _ => {
            let recipe = session.load()?;
            let total = recipe.total_emission_kg();
            let original = recipe.original_total_kg.unwrap_or(total);
            (current_kg.unwrap_or(original), new_kg.unwrap_or(total))
        }
    };
    let projection = svc.project_savings(current, new, meals_per_week, weeks)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&projection)?);
        return Ok(());
    }

    let per_meal = projection.saved_per_meal_kg;
    let weekly = projection.weekly_savings_kg;
    println!("Saving {per_meal:.3} kg per meal, {weekly:.3} kg per week");

    // Every fourth week keeps long projections readable
    let rows: Vec<WeekRow> = projection
        .weeks
        .iter()
        .filter(|w| w.week % 4 == 0 || w.week == weeks)
        .map(|w| WeekRow {
            week: w.week,
            saved: format!("{:.1}", w.cumulative_kg),
        })
        .collect();
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    let total = projection.total_saved_kg;
    let trees = projection.trees_offset;
    let flights = projection.flights_avoided;
    println!("After {weeks} weeks: {total:.1} kg CO2e saved");
    println!("  ≈ {trees:.1} trees absorbing CO2 for a year");
    println!("  ≈ {flights:.2} short-haul flights avoided");
    Ok(())
}
