use std::io::Read;

use anyhow::{Context, Result, bail};
use csv::StringRecord;

use crate::models::{
    CategoryFootprintRow, IngredientRecord, NutrientProfile, Nutrients, UnitConversionRow,
};

const DESCRIPTION: &str = "FoodDescription";
const FOOD_GROUP: &str = "FoodGroupName";
const EMISSION: &str = "CO2 Emission per Kg";

/// Header-name → column-index resolver shared by every table.
struct Columns {
    headers: StringRecord,
}

impl Columns {
    fn new(headers: StringRecord, required: &[&str]) -> Result<Self> {
        for name in required {
            if !headers.iter().any(|h| h.eq_ignore_ascii_case(name)) {
                bail!("Missing required column: {name}");
            }
        }
        Ok(Self { headers })
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.eq_ignore_ascii_case(name))
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.find(name)
            .with_context(|| format!("Missing '{name}' column"))
    }
}

fn reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn text(record: &StringRecord, idx: usize) -> String {
    record.get(idx).unwrap_or("").trim().to_string()
}

/// Empty cells and pandas-style `NaN` markers are missing values.
fn number(record: &StringRecord, idx: Option<usize>) -> Option<f64> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("nan"))
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Parse the ingredient emission table.
///
/// Expected header includes `FoodGroupName,FoodDescription,CO2 Emission per Kg`;
/// extra columns are ignored.
pub fn load_ingredients<R: Read>(input: R) -> Result<Vec<IngredientRecord>> {
    let mut rdr = reader(input);
    let headers = rdr.headers().context("Failed to read CSV headers")?.clone();
    let cols = Columns::new(headers, &[DESCRIPTION, FOOD_GROUP, EMISSION])?;
    let idx_desc = cols.require(DESCRIPTION)?;
    let idx_group = cols.require(FOOD_GROUP)?;
    let idx_emission = cols.require(EMISSION)?;

    let mut rows = Vec::new();
    for (line_num, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to parse CSV row {}", line_num + 2))?;
        let description = text(&record, idx_desc);
        if description.is_empty() {
            continue;
        }
        rows.push(IngredientRecord {
            description,
            food_group: text(&record, idx_group),
            emission_factor: number(&record, Some(idx_emission)),
        });
    }
    Ok(rows)
}

/// Parse the nutrient profile table. Nutrient columns are optional; an absent
/// column leaves that nutrient missing for every row.
pub fn load_nutrients<R: Read>(input: R) -> Result<Vec<NutrientProfile>> {
    let mut rdr = reader(input);
    let headers = rdr.headers().context("Failed to read CSV headers")?.clone();
    let cols = Columns::new(headers, &[DESCRIPTION, FOOD_GROUP])?;
    let idx_desc = cols.require(DESCRIPTION)?;
    let idx_group = cols.require(FOOD_GROUP)?;

    let idx_alcohol = cols.find("ALCOHOL");
    let idx_caffeine = cols.find("CAFFEINE");
    let idx_calcium = cols.find("CALCIUM");
    let idx_carbohydrate = cols.find("CARBOHYDRATE, TOTAL (BY DIFFERENCE)");
    let idx_cholesterol = cols.find("CHOLESTEROL");
    let idx_lipid = cols.find("FAT (TOTAL LIPIDS)");
    let idx_poly = cols.find("FATTY ACIDS, POLYUNSATURATED, TOTAL");
    let idx_saturated = cols.find("FATTY ACIDS, SATURATED, TOTAL");
    let idx_iron = cols.find("IRON");
    let idx_lactose = cols.find("LACTOSE");

    let mut rows = Vec::new();
    for (line_num, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to parse CSV row {}", line_num + 2))?;
        let description = text(&record, idx_desc);
        if description.is_empty() {
            continue;
        }
        rows.push(NutrientProfile {
            description,
            food_group: text(&record, idx_group),
            nutrients: Nutrients {
                alcohol: number(&record, idx_alcohol),
                caffeine: number(&record, idx_caffeine),
                calcium: number(&record, idx_calcium),
                carbohydrate: number(&record, idx_carbohydrate),
                cholesterol: number(&record, idx_cholesterol),
                lipid: number(&record, idx_lipid),
                polyunsaturated_fat: number(&record, idx_poly),
                saturated_fat: number(&record, idx_saturated),
                iron: number(&record, idx_iron),
                lactose: number(&record, idx_lactose),
            },
        });
    }
    Ok(rows)
}

/// Parse the unit conversion table (`from_unit,conversion_factor`).
pub fn load_units<R: Read>(input: R) -> Result<Vec<UnitConversionRow>> {
    let mut rdr = reader(input);
    let headers = rdr.headers().context("Failed to read CSV headers")?.clone();
    let cols = Columns::new(headers, &["from_unit", "conversion_factor"])?;
    let idx_unit = cols.require("from_unit")?;
    let idx_factor = cols.require("conversion_factor")?;

    let mut rows = Vec::new();
    for (line_num, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to parse CSV row {}", line_num + 2))?;
        let unit = text(&record, idx_unit);
        if unit.is_empty() {
            continue;
        }
        let grams_per_unit = number(&record, Some(idx_factor))
            .with_context(|| format!("Invalid conversion factor for unit '{unit}'"))?;
        rows.push(UnitConversionRow {
            unit,
            grams_per_unit,
        });
    }
    Ok(rows)
}

/// Parse the category footprint table (`Entity,GHG emissions per kilogram`).
/// Rows without a figure are skipped; they can never be eligible.
pub fn load_footprints<R: Read>(input: R) -> Result<Vec<CategoryFootprintRow>> {
    let mut rdr = reader(input);
    let headers = rdr.headers().context("Failed to read CSV headers")?.clone();
    let cols = Columns::new(headers, &["Entity", "GHG emissions per kilogram"])?;
    let idx_label = cols.require("Entity")?;
    let idx_figure = cols.require("GHG emissions per kilogram")?;

    let mut rows = Vec::new();
    for (line_num, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to parse CSV row {}", line_num + 2))?;
        let label = text(&record, idx_label);
        let Some(emission_per_kg) = number(&record, Some(idx_figure)) else {
            tracing::debug!(%label, "skipping footprint row without a figure");
            continue;
        };
        if label.is_empty() {
            continue;
        }
        rows.push(CategoryFootprintRow {
            label,
            emission_per_kg,
        });
    }
    Ok(rows)
}
