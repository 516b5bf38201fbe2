use anyhow::Result;
use std::process;

use ecoswap_core::FootprintService;

use super::helpers::print_ingredient_table;

pub(crate) fn cmd_ingredients(
    svc: &FootprintService,
    search: Option<&str>,
    group: Option<&str>,
    groups: bool,
    json: bool,
) -> Result<()> {
    if groups {
        let all = svc.data().food_groups();
        if json {
            println!("{}", serde_json::to_string_pretty(&all)?);
        } else {
            for g in &all {
                let label = svc.data().aliases().label_for(g).unwrap_or("-");
                println!("{g}  ({label})");
            }
        }
        return Ok(());
    }

    let found = svc.data().search_ingredients(search, group);
    if found.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No ingredients found");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&found)?);
        return Ok(());
    }
    print_ingredient_table(&found);
    let count = found.len();
    println!("{count} ingredient(s)");
    Ok(())
}
