use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::path::Path;
use std::process;

use ecoswap_core::FootprintService;
use ecoswap_core::models::{Recipe, RecipeLine};

use super::helpers::{
    format_amount, json_error, line_index, parse_quantity, print_evaluation, print_recipe_table,
};
use crate::session::SessionFile;

pub(crate) fn cmd_add(
    svc: &FootprintService,
    session: &SessionFile,
    ingredient: &str,
    quantity: &str,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let (amount, unit) = parse_quantity(quantity)?;
    let mut recipe = session.load()?;
    let line = svc.add_line(&mut recipe, category.unwrap_or(""), ingredient, amount, &unit)?;
    session.save(&recipe)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&line)?);
    } else {
        let desc = &line.description;
        let amount = format_amount(line.amount);
        let unit = &line.unit;
        let kg = line.emission_kg;
        let n = recipe.len();
        println!("Added #{n}: {desc} ({amount} {unit}) = {kg:.3} kg CO2e");
        if svc.data().ingredient(&line.description).is_none() {
            eprintln!("Note: '{desc}' is not in the ingredient table and counts as 0 kg");
        }
    }
    Ok(())
}

pub(crate) fn cmd_remove(
    svc: &FootprintService,
    session: &SessionFile,
    lines: &[usize],
    json: bool,
) -> Result<()> {
    let mut recipe = session.load()?;
    let indices = lines
        .iter()
        .map(|&n| line_index(n, recipe.len()))
        .collect::<Result<Vec<_>>>()?;
    let removed = svc.remove_lines(&mut recipe, &indices)?;
    session.save(&recipe)?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "removed": removed, "remaining": recipe.len() })
        );
    } else {
        let remaining = recipe.len();
        println!("Removed {removed} line(s), {remaining} remaining");
    }
    Ok(())
}

pub(crate) fn cmd_reset(svc: &FootprintService, session: &SessionFile, json: bool) -> Result<()> {
    let mut recipe = session.load()?;
    svc.reset_recipe(&mut recipe);
    session.save(&recipe)?;
    if json {
        println!("{}", serde_json::json!({ "reset": true }));
    } else {
        println!("Recipe cleared");
    }
    Ok(())
}

pub(crate) fn cmd_show(svc: &FootprintService, session: &SessionFile, json: bool) -> Result<()> {
    #[derive(Serialize)]
    struct RecipeView<'a> {
        #[serde(flatten)]
        recipe: &'a Recipe,
        total_kg: f64,
    }

    let recipe = session.load()?;
    if recipe.is_empty() {
        if json {
            println!("{}", json_error("Recipe is empty"));
        } else {
            eprintln!("Recipe is empty. Add ingredients with `ecoswap add`");
        }
        process::exit(2);
    }

    let eval = svc.evaluate_recipe(&recipe);
    if json {
        let view = RecipeView {
            recipe: &recipe,
            total_kg: eval.total_kg,
        };
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    print_recipe_table(&recipe);
    print_evaluation(&eval);
    if let Some(original) = recipe.original_total_kg {
        println!("  Before substitutions: {original:.3} kg");
    }
    Ok(())
}

pub(crate) fn cmd_evaluate(
    svc: &FootprintService,
    session: &SessionFile,
    json: bool,
) -> Result<()> {
    let recipe = session.load()?;
    let eval = svc.evaluate_recipe(&recipe);

    if json {
        println!("{}", serde_json::to_string_pretty(&eval)?);
        return Ok(());
    }

    print_evaluation(&eval);
    if eval.label.suggests_alternative() && !recipe.is_empty() {
        println!("\nTry `ecoswap suggest <line>` for a lower-emission substitute.");
    }
    Ok(())
}

/// One Cooklang ingredient reduced to what the recipe needs.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CookIngredient {
    pub name: String,
    pub amount: Option<f64>,
    pub unit: Option<String>,
}

pub(crate) fn parse_cooklang(input: &str) -> Result<(Option<String>, Vec<CookIngredient>)> {
    let (recipe_data, _report) = cooklang::parse(input)
        .into_result()
        .map_err(|e| anyhow::anyhow!("Failed to parse Cooklang file: {e}"))?;

    let title = recipe_data.metadata.title().map(String::from);
    let converter = cooklang::Converter::default();
    let ingredients = recipe_data
        .group_ingredients(&converter)
        .iter()
        .map(cook_ingredient)
        .collect();
    Ok((title, ingredients))
}

fn cook_ingredient(gi: &cooklang::ingredient_list::GroupedIngredient<'_>) -> CookIngredient {
    // First quantity only; ranges take their lower bound
    let (amount, unit) = gi
        .quantity
        .iter()
        .next()
        .map_or((None, None), |qty: &cooklang::Quantity| {
            let amount = match qty.value() {
                cooklang::Value::Number(n) => Some(n.value()),
                cooklang::Value::Range { start, .. } => Some(start.value()),
                cooklang::Value::Text(t) => t.trim().parse::<f64>().ok(),
            };
            (amount, qty.unit().map(|u| u.trim().to_string()))
        });

    CookIngredient {
        name: gi.ingredient.display_name().to_string(),
        amount,
        unit,
    }
}

#[derive(Debug, Serialize)]
struct ImportReport {
    title: Option<String>,
    added: Vec<RecipeLine>,
    skipped: Vec<String>,
    /// Added lines whose ingredient is not in the table and counts as 0 kg.
    unmatched: Vec<String>,
    total_kg: f64,
}

#[derive(Debug, Default)]
struct ImportedLines {
    added: Vec<RecipeLine>,
    skipped: Vec<String>,
    unmatched: Vec<String>,
}

/// Add each Cooklang ingredient as a recipe line. Ingredients without a
/// usable quantity, or with a unit missing from the unit table, are skipped.
fn import_lines(
    svc: &FootprintService,
    recipe: &mut Recipe,
    ingredients: &[CookIngredient],
) -> ImportedLines {
    let mut out = ImportedLines::default();

    for ing in ingredients {
        let name = &ing.name;
        let Some(amount) = ing.amount.filter(|a| *a > 0.0) else {
            out.skipped.push(format!("{name}: no quantity"));
            continue;
        };
        let unit = ing.unit.as_deref().unwrap_or("g");
        match svc.add_line(recipe, "", name, amount, unit) {
            Ok(line) => {
                if svc.data().ingredient(&line.description).is_none() {
                    out.unmatched.push(line.description.clone());
                }
                out.added.push(line);
            }
            Err(e) => {
                tracing::debug!(ingredient = %name, error = %e, "skipping cooklang ingredient");
                out.skipped.push(format!("{name}: {e}"));
            }
        }
    }
    out
}

pub(crate) fn cmd_import(
    svc: &FootprintService,
    session: &SessionFile,
    file: &Path,
    replace: bool,
    json: bool,
) -> Result<()> {
    let input = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;
    let (title, ingredients) = parse_cooklang(&input)?;
    if ingredients.is_empty() {
        bail!("No ingredients found in recipe");
    }

    let mut recipe = session.load()?;
    if replace {
        svc.reset_recipe(&mut recipe);
    }
    let imported = import_lines(svc, &mut recipe, &ingredients);
    if imported.added.is_empty() {
        bail!(
            "None of the {} ingredients could be imported:\n  {}",
            ingredients.len(),
            imported.skipped.join("\n  ")
        );
    }
    session.save(&recipe)?;

    let report = ImportReport {
        title,
        added: imported.added,
        skipped: imported.skipped,
        unmatched: imported.unmatched,
        total_kg: recipe.total_emission_kg(),
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let name = report
        .title
        .as_deref()
        .or_else(|| file.file_stem().and_then(|s| s.to_str()))
        .unwrap_or("recipe");
    let count = report.added.len();
    let total = report.total_kg;
    println!("Imported {name}: {count} ingredient(s), recipe now {total:.3} kg CO2e");
    if !report.skipped.is_empty() {
        eprintln!("Skipped:");
        for s in &report.skipped {
            eprintln!("  {s}");
        }
    }
    if !report.unmatched.is_empty() {
        eprintln!("Not in the ingredient table (counted as 0 kg):");
        for name in &report.unmatched {
            eprintln!("  {name}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecoswap_core::ReferenceData;
    use ecoswap_core::models::{Baseline, IngredientRecord, default_unit_rows};
    use ecoswap_core::reference::CategoryAliasMap;

    fn service() -> FootprintService {
        let data = ReferenceData::new(
            vec![
                IngredientRecord {
                    description: "Lentils".to_string(),
                    food_group: "Legumes and Legume Products".to_string(),
                    emission_factor: Some(0.9),
                },
                IngredientRecord {
                    description: "Olive oil".to_string(),
                    food_group: "Fats and Oils".to_string(),
                    emission_factor: Some(5.4),
                },
            ],
            vec![],
            default_unit_rows(),
            vec![],
            CategoryAliasMap::default(),
        );
        FootprintService::new(data, Baseline::new(2.0))
    }

    #[test]
    fn test_parse_cooklang_ingredients() {
        let input = "Rinse @lentils{500%g} and fry in @olive oil{2%tbsp}.\n\
                     Season with @salt.\n";
        let (_title, ingredients) = parse_cooklang(input).unwrap();
        assert_eq!(ingredients.len(), 3);
        assert_eq!(ingredients[0].name, "lentils");
        assert_eq!(ingredients[0].amount, Some(500.0));
        assert_eq!(ingredients[0].unit.as_deref(), Some("g"));
        assert_eq!(ingredients[1].unit.as_deref(), Some("tbsp"));
        assert_eq!(ingredients[2].amount, None);
    }

    #[test]
    fn test_import_lines_skips_unusable_ingredients() {
        let svc = service();
        let mut recipe = Recipe::new();
        let ingredients = vec![
            CookIngredient {
                name: "lentils".to_string(),
                amount: Some(500.0),
                unit: Some("g".to_string()),
            },
            CookIngredient {
                name: "olive oil".to_string(),
                amount: Some(2.0),
                unit: Some("tbsp".to_string()),
            },
            CookIngredient {
                name: "salt".to_string(),
                amount: None,
                unit: None,
            },
            CookIngredient {
                name: "water".to_string(),
                amount: Some(1.0),
                unit: Some("cup".to_string()),
            },
        ];
        let imported = import_lines(&svc, &mut recipe, &ingredients);
        assert_eq!(imported.added.len(), 2);
        assert_eq!(imported.added[0].description, "Lentils");
        assert!((imported.added[0].emission_kg - 0.45).abs() < 1e-9);
        // 2 tbsp = 30 g of oil
        assert!((imported.added[1].emission_kg - 0.162).abs() < 1e-9);
        assert_eq!(imported.skipped.len(), 2);
        assert!(imported.skipped[0].starts_with("salt"));
        assert!(imported.skipped[1].contains("cup"));
        assert!(imported.unmatched.is_empty());
        assert_eq!(recipe.len(), 2);
    }

    #[test]
    fn test_import_lines_defaults_to_grams() {
        let svc = service();
        let mut recipe = Recipe::new();
        let ingredients = vec![CookIngredient {
            name: "Lentils".to_string(),
            amount: Some(100.0),
            unit: None,
        }];
        let imported = import_lines(&svc, &mut recipe, &ingredients);
        assert_eq!(imported.added[0].unit, "g");
        assert!((imported.added[0].emission_kg - 0.09).abs() < 1e-9);
    }

    #[test]
    fn test_import_lines_reports_unmatched_ingredients() {
        let svc = service();
        let mut recipe = Recipe::new();
        let ingredients = vec![
            CookIngredient {
                name: "lentils".to_string(),
                amount: Some(200.0),
                unit: Some("g".to_string()),
            },
            CookIngredient {
                name: "smoked paprika".to_string(),
                amount: Some(5.0),
                unit: Some("g".to_string()),
            },
        ];
        let imported = import_lines(&svc, &mut recipe, &ingredients);
        assert_eq!(imported.added.len(), 2);
        assert!(imported.added[1].emission_kg.abs() < f64::EPSILON);
        assert_eq!(imported.unmatched, vec!["smoked paprika".to_string()]);
        assert!(imported.skipped.is_empty());
    }

    #[test]
    fn test_import_lines_keeps_unit_case() {
        let data = ReferenceData::new(
            vec![IngredientRecord {
                description: "Lentils".to_string(),
                food_group: "Legumes and Legume Products".to_string(),
                emission_factor: Some(0.9),
            }],
            vec![],
            vec![ecoswap_core::models::UnitConversionRow {
                unit: "Cup".to_string(),
                grams_per_unit: 200.0,
            }],
            vec![],
            CategoryAliasMap::default(),
        );
        let svc = FootprintService::new(data, Baseline::new(2.0));
        let mut recipe = Recipe::new();
        let ingredients = vec![CookIngredient {
            name: "lentils".to_string(),
            amount: Some(1.0),
            unit: Some("Cup".to_string()),
        }];
        let imported = import_lines(&svc, &mut recipe, &ingredients);
        assert_eq!(imported.added.len(), 1);
        assert_eq!(imported.added[0].unit, "Cup");
        assert!((imported.added[0].emission_kg - 0.18).abs() < 1e-9);
    }
}
