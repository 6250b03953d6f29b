// src/error.rs

use std::{io, path::PathBuf};

use thiserror::Error;

/// Failures surfaced by catalog lookups, file resolution, parsing and joins.
#[derive(Debug, Error)]
pub enum CensusError {
    #[error("table '{0}' not found in lookup catalog")]
    Lookup(String),

    #[error("expected exactly one file matching '{pattern}', found {found}")]
    FileResolution { pattern: String, found: usize },

    #[error("could not parse {field} from '{value}'")]
    Parse { field: &'static str, value: String },

    #[error("catalog entry for '{table_id}' is inconsistent: {details}")]
    Catalog { table_id: String, details: String },

    #[error("geography roster has no '{0}' column")]
    MissingColumn(String),

    #[error("column {index} is outside sequence file {path} ({width} columns)")]
    ColumnOutOfRange {
        index: usize,
        width: usize,
        path: PathBuf,
    },

    #[error("unknown state '{0}'")]
    UnknownState(String),

    #[error("missing data source {0}")]
    MissingSource(PathBuf),

    #[error("{count} rows of table '{table_id}' have no matching geography")]
    UnmatchedRecords { table_id: String, count: usize },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Pattern(#[from] glob::PatternError),

    #[error(transparent)]
    Shapefile(#[from] shapefile::Error),

    #[error(transparent)]
    Dbase(#[from] shapefile::dbase::Error),
}

impl CensusError {
    pub(crate) fn parse(field: &'static str, value: impl Into<String>) -> Self {
        CensusError::Parse {
            field,
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CensusError>;
