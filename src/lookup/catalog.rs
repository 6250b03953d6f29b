// src/lookup/catalog.rs

use csv::{ReaderBuilder, Trim};
use std::{
    collections::{BTreeMap, HashSet},
    fs::File,
    io::Read,
    path::Path,
};
use tracing::{debug, info, instrument, trace};

use super::spec::{TableSpec, FAMILY, UNIVERSE};
use crate::error::{CensusError, Result};
use crate::process::utils::{leading_integer, parse_u32};

/// One data row of the sequence/table number lookup file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogRow {
    pub file_id: String,
    pub table_id: String,
    pub sequence: String,
    pub line: String,
    pub start: String,
    pub cells: String,
    pub title: String,
    pub subject: String,
}

impl CatalogRow {
    fn from_fields(fields: &[String]) -> Self {
        let get = |i: usize| fields.get(i).cloned().unwrap_or_default();
        CatalogRow {
            file_id: get(0),
            table_id: get(1),
            sequence: get(2),
            line: get(3),
            start: get(4),
            cells: get(5),
            title: get(7),
            subject: get(8),
        }
    }
}

/// The parsed lookup file; answers `resolve(table_id)` queries.
#[derive(Debug, Clone)]
pub struct LookupCatalog {
    rows: Vec<CatalogRow>,
}

impl LookupCatalog {
    #[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(CensusError::MissingSource(path.to_path_buf()));
        }
        let catalog = Self::from_reader(File::open(path)?)?;
        info!(rows = catalog.rows.len(), "loaded lookup catalog");
        Ok(catalog)
    }

    /// Parse catalog CSV text. The first row is a header and is skipped.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut rows = Vec::new();
        for record in rdr.byte_records() {
            let record = record?;
            // The published file is not guaranteed to be UTF-8.
            let fields: Vec<String> = record
                .iter()
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .collect();
            rows.push(CatalogRow::from_fields(&fields));
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[CatalogRow] {
        &self.rows
    }

    /// Distinct table ids in catalog order.
    pub fn table_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .map(|r| r.table_id.as_str())
            .filter(|id| !id.is_empty() && seen.insert(*id))
            .collect()
    }

    /// Distinct table ids whose header row places them in `sequence`.
    pub fn tables_in_sequence(&self, sequence: u32) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .filter(|r| !r.start.is_empty())
            .filter(|r| parse_u32("sequence number", &r.sequence).ok() == Some(sequence))
            .map(|r| r.table_id.as_str())
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Build the `TableSpec` for `table_id`.
    ///
    /// The first matching row is the table header, the second its universe
    /// annotation, and every later row one data column.
    #[instrument(level = "debug", skip(self))]
    pub fn resolve(&self, table_id: &str) -> Result<TableSpec> {
        let matches: Vec<&CatalogRow> = self
            .rows
            .iter()
            .filter(|r| r.table_id == table_id)
            .collect();

        let header = *matches
            .first()
            .ok_or_else(|| CensusError::Lookup(table_id.to_string()))?;
        let universe = matches.get(1).ok_or_else(|| CensusError::Catalog {
            table_id: table_id.to_string(),
            details: "no universe row".into(),
        })?;

        let sequence = parse_u32("sequence number", &header.sequence)?;
        let start_position = parse_u32("start position", &header.start)? as usize;
        let num_cells = leading_integer("cell count", &header.cells)?;

        let mut column_titles = Vec::with_capacity(num_cells);
        let mut relative_positions = Vec::with_capacity(num_cells);
        for row in &matches[2..] {
            match parse_line_number(&row.line)? {
                Some(pos) => {
                    column_titles.push(row.title.clone());
                    relative_positions.push(pos);
                }
                None => trace!(title = %row.title, line = %row.line, "skipping heading row"),
            }
        }

        let mut specs = BTreeMap::new();
        specs.insert(UNIVERSE.to_string(), universe.title.clone());
        specs.insert(FAMILY.to_string(), header.subject.clone());

        debug!(sequence, start_position, num_cells, "resolved table");
        TableSpec::new(
            header.table_id.clone(),
            sequence,
            start_position,
            num_cells,
            header.title.clone(),
            column_titles,
            relative_positions,
            specs,
        )
    }
}

/// Whole line numbers are data columns; fractional ones (`0.5`, `7.5`) are
/// headings without a cell and yield `None`.
fn parse_line_number(raw: &str) -> Result<Option<usize>> {
    if let Ok(pos) = raw.parse::<usize>() {
        return Ok(Some(pos));
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v.fract() != 0.0 => Ok(None),
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(Some(v as usize)),
        _ => Err(CensusError::parse("column position", raw)),
    }
}
