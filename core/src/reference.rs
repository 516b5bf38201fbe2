use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

use crate::loader;
use crate::models::{
    CategoryFootprintRow, IngredientRecord, NutrientProfile, UnitConversionRow, default_unit_rows,
    normalize_description,
};

/// Food group → footprint label pairs bundled with the engine.
/// Order matters: eligible categories are reported in this order.
pub const DEFAULT_CATEGORY_ALIASES: &[(&str, &str)] = &[
    ("Dairy and Egg Products", "Dairy Products"),
    ("Spices and Herbs", "Species"),
    ("Fats and Oils", "Oils"),
    ("Poultry Products", "Poultry Meat"),
    ("Soups, Sauces and Gravies", "Sauces"),
    ("Sausages and Luncheon meats", "Pig Meat"),
    ("Breakfast cereals", "Cereals"),
    ("Fruits and fruit juices", "Fruits"),
    ("Pork Products", "Pig Meat"),
    ("Vegetables and Vegetable Products", "Other Vegetables"),
    ("Nuts and Seeds", "Nuts"),
    ("Beef Products", "Beef (dairy herd)"),
    ("Finfish and Shellfish Products", "Fish (farmed)"),
    ("Legumes and Legume Products", "Legumes"),
    ("Lamb, Veal and Game", "Lamb & Mutton"),
    ("Baked Products", "Wheat & Rye"),
    ("Sweets", "Sweets"),
    ("Beverages", "Beverages"),
    ("Cereals, Grains and Pasta", "Cereals"),
];

/// Ordered many-to-one map from ingredient food groups to footprint labels.
#[derive(Debug, Clone)]
pub struct CategoryAliasMap {
    entries: Vec<(String, String)>,
}

impl CategoryAliasMap {
    /// Later duplicates of a food group are dropped.
    #[must_use]
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut entries: Vec<(String, String)> = Vec::new();
        for (group, label) in pairs {
            let group = group.into();
            if entries.iter().all(|(g, _)| *g != group) {
                entries.push((group, label.into()));
            }
        }
        Self { entries }
    }

    #[must_use]
    pub fn label_for(&self, food_group: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(g, _)| g == food_group)
            .map(|(_, l)| l.as_str())
    }

    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.entries.iter().any(|(_, l)| l == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(g, l)| (g.as_str(), l.as_str()))
    }
}

impl Default for CategoryAliasMap {
    fn default() -> Self {
        Self::new(DEFAULT_CATEGORY_ALIASES.iter().copied())
    }
}

/// Immutable dataset snapshot the engine runs against.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    ingredients: Vec<IngredientRecord>,
    nutrients: Vec<NutrientProfile>,
    units: Vec<UnitConversionRow>,
    footprints: Vec<CategoryFootprintRow>,
    aliases: CategoryAliasMap,
    ingredient_index: HashMap<String, usize>,
    profile_index: HashMap<String, usize>,
}

impl ReferenceData {
    #[must_use]
    pub fn new(
        ingredients: Vec<IngredientRecord>,
        nutrients: Vec<NutrientProfile>,
        units: Vec<UnitConversionRow>,
        footprints: Vec<CategoryFootprintRow>,
        aliases: CategoryAliasMap,
    ) -> Self {
        let ingredient_index = first_row_index(ingredients.iter().map(|r| &r.description));
        let profile_index = first_row_index(nutrients.iter().map(|p| &p.description));
        Self {
            ingredients,
            nutrients,
            units,
            footprints,
            aliases,
            ingredient_index,
            profile_index,
        }
    }

    /// Load `ingredients.csv`, `nutrients.csv`, `footprints.csv` and, if present,
    /// `units.csv` from a directory. Without a unit table the built-in units apply.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let open = |name: &str| {
            let path = dir.join(name);
            std::fs::File::open(&path)
                .with_context(|| format!("Failed to open {}", path.display()))
        };

        let ingredients = loader::load_ingredients(open("ingredients.csv")?)
            .context("Failed to load ingredients.csv")?;
        let nutrients = loader::load_nutrients(open("nutrients.csv")?)
            .context("Failed to load nutrients.csv")?;
        let footprints = loader::load_footprints(open("footprints.csv")?)
            .context("Failed to load footprints.csv")?;
        let units = if dir.join("units.csv").exists() {
            loader::load_units(open("units.csv")?).context("Failed to load units.csv")?
        } else {
            default_unit_rows()
        };

        tracing::info!(
            ingredients = ingredients.len(),
            nutrients = nutrients.len(),
            units = units.len(),
            footprints = footprints.len(),
            dir = %dir.display(),
            "loaded reference data"
        );

        Ok(Self::new(
            ingredients,
            nutrients,
            units,
            footprints,
            CategoryAliasMap::default(),
        ))
    }

    #[must_use]
    pub fn ingredient(&self, description: &str) -> Option<&IngredientRecord> {
        self.ingredient_index
            .get(&normalize_description(description))
            .map(|&i| &self.ingredients[i])
    }

    #[must_use]
    pub fn profile(&self, description: &str) -> Option<&NutrientProfile> {
        self.profile_index
            .get(&normalize_description(description))
            .map(|&i| &self.nutrients[i])
    }

    /// Exact, case-sensitive unit lookup.
    #[must_use]
    pub fn unit(&self, unit: &str) -> Option<&UnitConversionRow> {
        self.units.iter().find(|u| u.unit == unit)
    }

    #[must_use]
    pub fn ingredients(&self) -> &[IngredientRecord] {
        &self.ingredients
    }

    #[must_use]
    pub fn profiles(&self) -> &[NutrientProfile] {
        &self.nutrients
    }

    #[must_use]
    pub fn units(&self) -> &[UnitConversionRow] {
        &self.units
    }

    #[must_use]
    pub fn footprints(&self) -> &[CategoryFootprintRow] {
        &self.footprints
    }

    #[must_use]
    pub fn aliases(&self) -> &CategoryAliasMap {
        &self.aliases
    }

    /// Distinct food groups in dataset order.
    #[must_use]
    pub fn food_groups(&self) -> Vec<&str> {
        let mut groups: Vec<&str> = Vec::new();
        for r in &self.ingredients {
            if !groups.contains(&r.food_group.as_str()) {
                groups.push(&r.food_group);
            }
        }
        groups
    }

    /// Case-insensitive substring search over descriptions, optionally within one group.
    #[must_use]
    pub fn search_ingredients(&self, query: Option<&str>, group: Option<&str>) -> Vec<&IngredientRecord> {
        let needle = query.map(normalize_description);
        self.ingredients
            .iter()
            .filter(|r| group.is_none_or(|g| r.food_group == g))
            .filter(|r| {
                needle
                    .as_deref()
                    .is_none_or(|n| r.description.to_lowercase().contains(n))
            })
            .collect()
    }
}

fn first_row_index<'a>(keys: impl Iterator<Item = &'a String>) -> HashMap<String, usize> {
    let mut index = HashMap::new();
    for (i, key) in keys.enumerate() {
        index.entry(normalize_description(key)).or_insert(i);
    }
    index
}
