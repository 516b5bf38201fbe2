use anyhow::Result;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use ecoswap_core::FootprintService;

use super::helpers::{
    exit_if_not_found, format_amount, json_error, line_index, parse_quantity, print_evaluation,
    truncate,
};
use crate::session::SessionFile;

pub(crate) fn cmd_eligible(svc: &FootprintService, ingredient: &str, json: bool) -> Result<()> {
    let categories = svc.eligible_categories(ingredient);
    if categories.is_empty() {
        let message = format!("No lower-emission category for '{ingredient}'");
        if json {
            println!("{}", json_error(&message));
        } else {
            eprintln!("{message}");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&categories)?);
        return Ok(());
    }
    for c in &categories {
        println!("{c}");
    }
    Ok(())
}

pub(crate) fn cmd_suggest(
    svc: &FootprintService,
    session: &SessionFile,
    line: usize,
    category: Option<&str>,
    attempt: usize,
    ranked: bool,
    json: bool,
) -> Result<()> {
    let recipe = session.load()?;
    let idx = line_index(line, recipe.len())?;

    if ranked {
        return print_ranked(svc, &recipe.lines[idx].description, category, json);
    }

    let suggestion = svc
        .suggest_for_line(&recipe, idx, category, attempt)
        .map_err(|e| exit_if_not_found(e, json))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&suggestion)?);
        return Ok(());
    }

    let alt = &suggestion.alternative;
    let original = &suggestion.original;
    let name = &alt.description;
    let group = &alt.food_group;
    let rank = alt.rank + 1;
    println!("Line {line}: {original}");
    println!("  Try: {name} ({group}, match #{rank})");
    println!(
        "  Emission factor: {:.2} → {:.2} kg CO2e/kg",
        alt.original_emission_factor, alt.emission_factor
    );
    if suggestion.eligible_categories.len() > 1 {
        println!(
            "  Other categories: {}",
            suggestion
                .eligible_categories
                .iter()
                .filter(|c| **c != suggestion.category)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    let next = attempt + 1;
    println!("\nNot quite right? `ecoswap suggest {line} --attempt {next}`");
    Ok(())
}

fn print_ranked(
    svc: &FootprintService,
    description: &str,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct CandidateRow {
        #[tabled(rename = "Attempt")]
        attempt: usize,
        #[tabled(rename = "Ingredient")]
        description: String,
        #[tabled(rename = "Distance")]
        distance: String,
        #[tabled(rename = "kg CO2e/kg")]
        factor: String,
        #[tabled(rename = "Lower?")]
        improves: &'static str,
    }

    let eligible = svc.eligible_categories(description);
    let category = match category {
        Some(c) => c.to_string(),
        None => match eligible.first() {
            Some(c) => c.clone(),
            None => {
                return Err(exit_if_not_found(
                    ecoswap_core::EngineError::CategoryIneligible(description.to_string()),
                    json,
                ));
            }
        },
    };
    let candidates = svc
        .ranked_candidates(&category, description)
        .map_err(|e| exit_if_not_found(e, json))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
        return Ok(());
    }
    if candidates.is_empty() {
        eprintln!("No candidates in '{category}'");
        process::exit(2);
    }

    let rows: Vec<CandidateRow> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| CandidateRow {
            attempt: i,
            description: truncate(&c.description, 45),
            distance: format!("{:.1}", c.distance),
            factor: c.emission_factor.map_or("-".into(), |v| format!("{v:.2}")),
            improves: if c.improves { "yes" } else { "no" },
        })
        .collect();

    println!("{category}:");
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_swap(
    svc: &FootprintService,
    session: &SessionFile,
    line: usize,
    ingredient: &str,
    quantity: &str,
    json: bool,
) -> Result<()> {
    let (amount, unit) = parse_quantity(quantity)?;
    let mut recipe = session.load()?;
    let idx = line_index(line, recipe.len())?;
    let replaced = recipe.lines[idx].clone();
    let new_line = svc.apply_substitution(&mut recipe, idx, ingredient, amount, &unit)?;
    session.save(&recipe)?;

    let eval = svc.evaluate_recipe(&recipe);
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "replaced": replaced,
                "line": new_line,
                "evaluation": eval,
            }))?
        );
        return Ok(());
    }

    let old = &replaced.description;
    let new = &new_line.description;
    let amount = format_amount(new_line.amount);
    let unit = &new_line.unit;
    let saved = replaced.emission_kg - new_line.emission_kg;
    println!("Line {line}: {old} → {new} ({amount} {unit}), saving {saved:.3} kg CO2e");
    print_evaluation(&eval);
    Ok(())
}
