// src/process/roster.rs

use csv::ReaderBuilder;
use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};
use tracing::{info, instrument};

use crate::error::{CensusError, Result};

/// Field names of the 2018 ACS 5-year geography file, in file order.
pub const DEFAULT_GEO_TEMPLATE: &[&str] = &[
    "FILEID", "STUSAB", "SUMLEVEL", "COMPONENT", "LOGRECNO", "US", "REGION", "DIVISION",
    "STATECE", "STATE", "COUNTY", "COUSUB", "PLACE", "TRACT", "BLKGRP", "CONCIT", "AIANHH",
    "AIANHHFP", "AIHHTLI", "AITSCE", "AITS", "ANRC", "CBSA", "CSA", "METDIV", "MACC", "MEMI",
    "NECTA", "CNECTA", "NECTADIV", "UA", "BLANK1", "CDCURR", "SLDU", "SLDL", "BLANK2", "BLANK3",
    "ZCTA5", "SUBMCD", "SDELM", "SDSEC", "SDUNI", "UR", "PCI", "BLANK4", "BLANK5", "PUMA5",
    "BLANK6", "GEOID", "NAME", "BTTR", "BTBG", "BLANK7",
];

/// Read a one-row CSV listing the roster's field names.
pub fn load_template<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(CensusError::MissingSource(path.to_path_buf()));
    }
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .from_reader(File::open(path)?);
    let first = rdr.records().next().transpose()?.unwrap_or_default();
    Ok(first.iter().map(|s| s.trim().to_string()).collect())
}

pub fn default_template() -> Vec<String> {
    DEFAULT_GEO_TEMPLATE.iter().map(|s| s.to_string()).collect()
}

/// A state's geography file: headerless on disk, names supplied by a template.
#[derive(Debug, Clone)]
pub struct GeoRoster {
    pub headers: Vec<String>,
    /// One entry per record, padded to `headers.len()`.
    pub rows: Vec<Vec<String>>,
}

impl GeoRoster {
    #[instrument(level = "info", skip(path, headers), fields(path = %path.as_ref().display()))]
    pub fn load<P: AsRef<Path>>(path: P, headers: Vec<String>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let roster = Self::from_reader(headers, BufReader::new(file))?;
        info!(rows = roster.rows.len(), "loaded geography roster");
        Ok(roster)
    }

    pub fn from_reader<R: Read>(headers: Vec<String>, reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Vec::new();
        for record in rdr.byte_records() {
            let record = record?;
            // Place names are Latin-1 in older releases.
            let mut row: Vec<String> = record
                .iter()
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .collect();
            row.resize(headers.len().max(row.len()), String::new());
            rows.push(row);
        }
        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| CensusError::MissingColumn(name.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn template_from_file() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("geo_file_template.csv");
        fs::write(&path, "FILEID,STUSAB,LOGRECNO, NAME\n")?;
        assert_eq!(load_template(&path)?, vec!["FILEID", "STUSAB", "LOGRECNO", "NAME"]);
        assert!(matches!(
            load_template(dir.path().join("nope.csv")),
            Err(CensusError::MissingSource(_))
        ));
        Ok(())
    }

    #[test]
    fn short_rows_are_padded() {
        let headers = vec!["LOGRECNO".to_string(), "STATE".into(), "BLKGRP".into()];
        let roster = GeoRoster::from_reader(headers, "0000001,06\n0000002,06,1\n".as_bytes())
            .unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.rows[0], vec!["0000001", "06", ""]);
        assert_eq!(roster.column_index("BLKGRP").unwrap(), 2);
        assert!(matches!(
            roster.column_index("GEOID"),
            Err(CensusError::MissingColumn(c)) if c == "GEOID"
        ));
    }

    /// One roster line in default-template order; unnamed fields are blank.
    pub(crate) fn roster_line(values: &[(&str, &str)]) -> String {
        let fields: Vec<String> = DEFAULT_GEO_TEMPLATE
            .iter()
            .map(|name| {
                let v = values
                    .iter()
                    .find(|(k, _)| k == name)
                    .map_or("", |(_, v)| *v);
                if v.contains(',') {
                    format!("\"{}\"", v)
                } else {
                    v.to_string()
                }
            })
            .collect();
        format!("{}\n", fields.join(","))
    }

    #[test]
    fn quoted_names_keep_commas() {
        let line = roster_line(&[
            ("LOGRECNO", "0000001"),
            ("GEOID", "15000US060014001001"),
            (
                "NAME",
                "Block Group 1, Census Tract 4001, Alameda County, California",
            ),
        ]);
        let roster = GeoRoster::from_reader(default_template(), line.as_bytes()).unwrap();
        assert_eq!(roster.rows[0].len(), DEFAULT_GEO_TEMPLATE.len());
        let name = roster.column_index("NAME").unwrap();
        assert_eq!(
            roster.rows[0][name],
            "Block Group 1, Census Tract 4001, Alameda County, California"
        );
    }
}
