// src/process/sequence.rs

use arrow::array::StringArray;
use csv::{ReaderBuilder, StringRecord};
use std::{
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

use super::utils::{parse_u32, resolve_unique};
use crate::error::{CensusError, Result};

/// Zero-based position of LOGRECNO in every sequence row.
pub const LOGRECNO_COLUMN: usize = 5;

/// One headerless sequence estimate file, kept as raw text records.
#[derive(Debug, Clone)]
pub struct SequenceFrame {
    path: PathBuf,
    records: Vec<StringRecord>,
    width: usize,
}

impl SequenceFrame {
    pub fn from_reader<R: Read>(path: impl Into<PathBuf>, reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .from_reader(reader);
        let records = rdr.records().collect::<std::result::Result<Vec<_>, _>>()?;
        let width = records.first().map_or(0, StringRecord::len);
        Ok(Self {
            path: path.into(),
            records,
            width,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn num_rows(&self) -> usize {
        self.records.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Column `index` as a string array, one entry per row.
    ///
    /// An empty file has no width to check against and yields empty columns.
    pub fn column(&self, index: usize) -> Result<StringArray> {
        if self.records.is_empty() {
            return Ok(StringArray::from(Vec::<&str>::new()));
        }
        if index >= self.width {
            return Err(CensusError::ColumnOutOfRange {
                index,
                width: self.width,
                path: self.path.clone(),
            });
        }
        Ok(self.records.iter().map(|r| r.get(index)).collect())
    }

    /// The join key of each row.
    pub fn logrecnos(&self) -> Result<Vec<u32>> {
        let column = self.column(LOGRECNO_COLUMN)?;
        column
            .iter()
            .map(|v| parse_u32("LOGRECNO", v.unwrap_or_default()))
            .collect()
    }
}

/// Finds and parses `e<release>*<seq4>000.txt` files in one state folder.
#[derive(Debug, Clone)]
pub struct SequenceLoader {
    base_folder: PathBuf,
    release: String,
}

impl SequenceLoader {
    pub fn new(base_folder: impl Into<PathBuf>, release: impl Into<String>) -> Self {
        Self {
            base_folder: base_folder.into(),
            release: release.into(),
        }
    }

    pub fn file_pattern(&self, sequence: u32) -> String {
        format!("e{}*{:04}000.txt", self.release, sequence)
    }

    /// Re-reads the file on every call.
    #[instrument(level = "debug", skip(self), fields(folder = %self.base_folder.display()))]
    pub fn load(&self, sequence: u32) -> Result<SequenceFrame> {
        let path = resolve_unique(&self.base_folder, &self.file_pattern(sequence))?;
        let file = File::open(&path)?;
        let frame = SequenceFrame::from_reader(path.clone(), BufReader::new(file))?;
        debug!(
            path = %path.display(),
            rows = frame.num_rows(),
            width = frame.width(),
            "parsed sequence file"
        );
        Ok(frame)
    }
}
