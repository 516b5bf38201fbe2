use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

use ecoswap_core::models::Baseline;

pub const DATA_DIR_ENV: &str = "ECOSWAP_DATA_DIR";
pub const BASELINE_ENV: &str = "ECOSWAP_BASELINE_KG";

pub struct Config {
    pub data_dir: PathBuf,
    pub session_path: PathBuf,
    pub baseline: Baseline,
}

impl Config {
    /// Resolve settings: command-line flag, then environment, then defaults.
    pub fn load(data_dir: Option<PathBuf>, baseline_kg: Option<f64>) -> Result<Self> {
        let data_dir = match data_dir.or_else(|| std::env::var_os(DATA_DIR_ENV).map(PathBuf::from)) {
            Some(dir) => dir,
            None => ProjectDirs::from("", "", "ecoswap")
                .context("Could not determine home directory")?
                .data_dir()
                .to_path_buf(),
        };
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let baseline = match baseline_kg {
            Some(kg) => kg,
            None => match std::env::var(BASELINE_ENV) {
                Ok(raw) => raw
                    .trim()
                    .parse::<f64>()
                    .with_context(|| format!("Invalid {BASELINE_ENV} value '{raw}'"))?,
                Err(_) => Baseline::national_default().kg,
            },
        };
        if !(baseline.is_finite() && baseline > 0.0) {
            anyhow::bail!("Baseline must be a positive number of kg (got {baseline})");
        }

        let session_path = data_dir.join("session.json");

        Ok(Config {
            data_dir,
            session_path,
            baseline: Baseline::new(baseline),
        })
    }
}
