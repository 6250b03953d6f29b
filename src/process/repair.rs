// src/process/repair.rs

use serde::Serialize;
use tracing::{debug, instrument};

use super::roster::GeoRoster;
use super::utils::{clean_str, parse_u32};
use crate::error::{CensusError, Result};

/// The geography fields carried into extracted tables, in output order after LOGRECNO.
pub const GEOGRAPHY_COLUMNS: [&str; 6] = ["GEOID12", "NAME", "STATE", "COUNTY", "TRACT", "BLKGRP"];

/// A block-group row of the roster with its rebuilt 12-digit identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockGroup {
    pub logrecno: u32,
    pub geoid12: String,
    /// GEOID as published, e.g. `15000US060014001001`.
    pub geoid: String,
    pub name: String,
    pub state: u32,
    pub county: u32,
    pub tract: u32,
    pub blkgrp: u32,
}

/// STATE(2) + COUNTY(3) + TRACT(6) + BLKGRP(1), each zero-padded.
pub fn geoid12(state: u32, county: u32, tract: u32, blkgrp: u32) -> Result<String> {
    for (field, value, width) in [
        ("STATE", state, 2),
        ("COUNTY", county, 3),
        ("TRACT", tract, 6),
        ("BLKGRP", blkgrp, 1),
    ] {
        if value >= 10u32.pow(width) {
            return Err(CensusError::parse(field, value.to_string()));
        }
    }
    Ok(format!(
        "{:02}{:03}{:06}{:01}",
        state, county, tract, blkgrp
    ))
}

/// Keep the roster rows that carry a block group and rebuild their GEOID12.
///
/// Rows with a blank BLKGRP (tract and higher summaries) are dropped.
#[instrument(level = "debug", skip(roster), fields(rows = roster.len()))]
pub fn repair_block_groups(roster: &GeoRoster) -> Result<Vec<BlockGroup>> {
    let logrecno = roster.column_index("LOGRECNO")?;
    let state = roster.column_index("STATE")?;
    let county = roster.column_index("COUNTY")?;
    let tract = roster.column_index("TRACT")?;
    let blkgrp = roster.column_index("BLKGRP")?;
    let geoid = roster.column_index("GEOID")?;
    let name = roster.column_index("NAME")?;

    let mut out = Vec::new();
    for row in &roster.rows {
        if clean_str(&row[blkgrp]).is_empty() {
            continue;
        }
        let fips = (
            parse_u32("STATE", &row[state])?,
            parse_u32("COUNTY", &row[county])?,
            parse_u32("TRACT", &row[tract])?,
            parse_u32("BLKGRP", &row[blkgrp])?,
        );
        out.push(BlockGroup {
            logrecno: parse_u32("LOGRECNO", &row[logrecno])?,
            geoid12: geoid12(fips.0, fips.1, fips.2, fips.3)?,
            geoid: row[geoid].clone(),
            name: row[name].clone(),
            state: fips.0,
            county: fips.1,
            tract: fips.2,
            blkgrp: fips.3,
        });
    }

    debug!(block_groups = out.len(), "repaired block-group geoids");
    Ok(out)
}
