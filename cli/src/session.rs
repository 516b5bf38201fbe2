use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use ecoswap_core::models::Recipe;

/// The CLI's recipe-in-progress, kept as JSON between invocations.
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// A missing file is an empty recipe.
    pub fn load(&self) -> Result<Recipe> {
        if !self.path.exists() {
            return Ok(Recipe::new());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session: {}", self.path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Corrupt session file: {}", self.path.display()))
    }

    pub fn save(&self, recipe: &Recipe) -> Result<()> {
        let json = serde_json::to_string_pretty(recipe)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write session: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace session: {}", self.path.display()))?;
        Ok(())
    }
}
