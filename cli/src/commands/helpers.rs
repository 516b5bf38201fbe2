use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use ecoswap_core::EngineError;
use ecoswap_core::models::{Evaluation, IngredientRecord, Recipe};

/// Parse a quantity string with optional unit into `(amount, unit)`.
/// Accepts: "200", "200g", "1.5kg", "2 tbsp", "3 oz". A bare number is grams.
/// The unit keeps its case; unit lookup is exact.
pub(crate) fn parse_quantity(s: &str) -> Result<(f64, String)> {
    let s = s.trim();

    if let Ok(amount) = s.parse::<f64>() {
        return Ok((check_amount(amount, s)?, "g".to_string()));
    }

    // "N<unit>" with no space (e.g. "500ml", "2tbsp")
    if let Some((amount, unit)) = split_number_unit(s) {
        return Ok((check_amount(amount, s)?, unit.to_string()));
    }

    // "<number> <unit>"
    let parts: Vec<&str> = s.splitn(2, char::is_whitespace).collect();
    if parts.len() == 2 {
        let amount: f64 = parts[0]
            .parse()
            .with_context(|| format!("Invalid quantity: '{s}'"))?;
        let unit = parts[1].trim();
        if unit.is_empty() {
            bail!("Invalid quantity: '{s}'");
        }
        return Ok((check_amount(amount, s)?, unit.to_string()));
    }

    bail!("Invalid quantity format: '{s}'. Use '200g', '1.5 kg', '2 tbsp', etc.")
}

fn check_amount(amount: f64, raw: &str) -> Result<f64> {
    if !amount.is_finite() || amount <= 0.0 {
        bail!("Quantity must be greater than 0 (got '{raw}')");
    }
    Ok(amount)
}

/// Split "500ml" or "2.5tbsp" into (500.0, "ml") or (2.5, "tbsp").
fn split_number_unit(s: &str) -> Option<(f64, &str)> {
    let idx = s.find(|c: char| c.is_alphabetic())?;
    if idx == 0 {
        return None;
    }
    let (num_part, unit_part) = s.split_at(idx);
    let qty: f64 = num_part.trim().parse().ok()?;
    if unit_part.is_empty() {
        return None;
    }
    Some((qty, unit_part))
}

/// Users count recipe lines from 1.
pub(crate) fn line_index(line: usize, len: usize) -> Result<usize> {
    if line == 0 {
        bail!("Line numbers start at 1");
    }
    if line > len {
        bail!("Line {line} does not exist (recipe has {len} lines)");
    }
    Ok(line - 1)
}

/// Report a "nothing found" engine error and exit with status 2.
/// Any other error is returned to the caller.
pub(crate) fn exit_if_not_found(err: EngineError, json: bool) -> anyhow::Error {
    if err.is_not_found() {
        let message = err.to_string();
        if json {
            println!("{}", json_error(&message));
        } else {
            eprintln!("{message}");
        }
        process::exit(2);
    }
    err.into()
}

pub(crate) fn print_recipe_table(recipe: &Recipe) {
    #[derive(Tabled)]
    struct LineRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "Ingredient")]
        description: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Amount")]
        amount: String,
        #[tabled(rename = "kg CO2e")]
        emission: String,
    }

    let rows: Vec<LineRow> = recipe
        .lines
        .iter()
        .enumerate()
        .map(|(i, l)| LineRow {
            idx: i + 1,
            description: truncate(&l.description, 40),
            category: truncate(&l.category, 28),
            amount: format!("{} {}", format_amount(l.amount), l.unit),
            emission: format!("{:.3}", no_neg_zero(l.emission_kg)),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_ingredient_table(ingredients: &[&IngredientRecord]) {
    #[derive(Tabled)]
    struct IngredientRow {
        #[tabled(rename = "Ingredient")]
        description: String,
        #[tabled(rename = "Food group")]
        food_group: String,
        #[tabled(rename = "kg CO2e/kg")]
        factor: String,
    }

    let rows: Vec<IngredientRow> = ingredients
        .iter()
        .map(|i| IngredientRow {
            description: truncate(&i.description, 50),
            food_group: truncate(&i.food_group, 32),
            factor: i.emission_factor.map_or("-".into(), |v| format!("{v:.2}")),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_evaluation(eval: &Evaluation) {
    let total = no_neg_zero(eval.total_kg);
    let baseline = eval.baseline_kg;
    let label = eval.label;
    println!("Total: {total:.3} kg CO2e  |  Baseline: {baseline:.3} kg  |  {label}");
    if eval.delta_kg < 0.0 {
        let over = -eval.delta_kg;
        println!("  {over:.3} kg over the per-meal baseline");
    } else {
        let under = no_neg_zero(eval.delta_kg);
        println!("  {under:.3} kg under the per-meal baseline");
    }
}

pub(crate) fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{amount:.0}")
    } else {
        format!("{amount:.2}")
    }
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
