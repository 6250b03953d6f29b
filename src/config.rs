// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    path::{Path, PathBuf},
};

/// What to do with sequence rows whose LOGRECNO has no block-group match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinPolicy {
    /// Drop them (logged at `warn`).
    #[default]
    Drop,
    /// Fail with `CensusError::UnmatchedRecords`.
    Strict,
}

/// Where the ACS downloads live and which release they belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CensusConfig {
    /// Directory containing one `<StateName>_Tracts_Block_Groups_Only` folder per state.
    pub data_dir: PathBuf,
    /// The `ACS_5yr_Seq_Table_Number_Lookup` CSV.
    pub catalog_path: PathBuf,
    /// Directory holding `tl_<year>_<fips>_bg.{zip,shp,geojson,json}` boundary files.
    pub geometry_dir: PathBuf,
    /// One-row CSV of geography roster field names; built-in template when unset.
    #[serde(default)]
    pub geo_template_path: Option<PathBuf>,
    #[serde(default = "default_year")]
    pub year: u16,
    #[serde(default = "default_span")]
    pub span: u8,
    #[serde(default)]
    pub join: JoinPolicy,
}

fn default_year() -> u16 {
    2018
}

fn default_span() -> u8 {
    5
}

impl CensusConfig {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        catalog_path: impl Into<PathBuf>,
        geometry_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            catalog_path: catalog_path.into(),
            geometry_dir: geometry_dir.into(),
            geo_template_path: None,
            year: default_year(),
            span: default_span(),
            join: JoinPolicy::default(),
        }
    }

    /// Load a YAML config file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("opening config {}", path.display()))?;
        serde_yaml::from_reader(file).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Release prefix used in file names, e.g. `"20185"` for the 2018 5-year release.
    pub fn release(&self) -> String {
        format!("{}{}", self.year, self.span)
    }
}
