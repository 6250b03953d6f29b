// src/lookup/spec.rs

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{CensusError, Result};

/// Metadata key for the universe annotation row.
pub const UNIVERSE: &str = "Universe";
/// Metadata key for the subject-area (family) code of the header row.
pub const FAMILY: &str = "Family";

/// Where one census table lives inside its sequence file and what its columns are called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSpec {
    pub id: String,
    pub sequence: u32,
    /// 1-based start position as published in the catalog.
    pub start_position: usize,
    pub num_cells: usize,
    pub title: String,
    pub column_titles: Vec<String>,
    /// Line numbers relative to the table start, as published.
    pub relative_positions: Vec<usize>,
    /// Zero-based column indices into a raw sequence file row.
    pub column_indices: Vec<usize>,
    pub specs: BTreeMap<String, String>,
}

impl TableSpec {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        sequence: u32,
        start_position: usize,
        num_cells: usize,
        title: impl Into<String>,
        column_titles: Vec<String>,
        relative_positions: Vec<usize>,
        specs: BTreeMap<String, String>,
    ) -> Result<Self> {
        let id = id.into();
        if column_titles.len() != relative_positions.len() || column_titles.len() != num_cells {
            return Err(CensusError::Catalog {
                table_id: id,
                details: format!(
                    "{} titles and {} positions for {} cells",
                    column_titles.len(),
                    relative_positions.len(),
                    num_cells
                ),
            });
        }

        // The published position skips the two leading header fields of a sequence row.
        let column_indices = relative_positions
            .iter()
            .map(|rel| {
                (rel + start_position)
                    .checked_sub(2)
                    .ok_or_else(|| CensusError::Catalog {
                        table_id: id.clone(),
                        details: format!("position {} before start {}", rel, start_position),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            id,
            sequence,
            start_position,
            num_cells,
            title: title.into(),
            column_titles,
            relative_positions,
            column_indices,
            specs,
        })
    }

    pub fn universe(&self) -> Option<&str> {
        self.specs.get(UNIVERSE).map(String::as_str)
    }

    pub fn family(&self) -> Option<&str> {
        self.specs.get(FAMILY).map(String::as_str)
    }
}
