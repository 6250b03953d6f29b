// src/state.rs

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{info, instrument};

use crate::config::CensusConfig;
use crate::error::{CensusError, Result};
use crate::extract::{ExtractedTable, GeoTableExtractor, TableExtractor};
use crate::geometry::BoundaryGeometry;
use crate::lookup::LookupCatalog;
use crate::process::{
    repair::{repair_block_groups, BlockGroup},
    roster::{default_template, load_template, GeoRoster},
    sequence::{SequenceFrame, SequenceLoader},
    utils::resolve_unique,
};
use crate::states::{StateInfo, StateResolver, UsStates};

/// Everything loaded for one state: roster, repaired block groups and boundaries.
///
/// Construction reads all three eagerly; tables are recomputed per request.
#[derive(Debug)]
pub struct StateContext {
    info: StateInfo,
    catalog: Arc<LookupCatalog>,
    config: CensusConfig,
    base_folder: PathBuf,
    locations: GeoRoster,
    block_groups: Vec<BlockGroup>,
    geometry: BoundaryGeometry,
    sequences: SequenceLoader,
}

impl StateContext {
    /// Open a state by name, abbreviation or FIPS using the built-in state table.
    pub fn open(
        name_or_fips: &str,
        catalog: Arc<LookupCatalog>,
        config: &CensusConfig,
    ) -> Result<Self> {
        Self::open_with(name_or_fips, catalog, config, &UsStates)
    }

    #[instrument(level = "info", skip(catalog, config, resolver))]
    pub fn open_with(
        name_or_fips: &str,
        catalog: Arc<LookupCatalog>,
        config: &CensusConfig,
        resolver: &dyn StateResolver,
    ) -> Result<Self> {
        let info = resolver
            .resolve(name_or_fips)
            .ok_or_else(|| CensusError::UnknownState(name_or_fips.to_string()))?;

        let base_folder = config.data_dir.join(info.folder_name());
        if !base_folder.is_dir() {
            return Err(CensusError::MissingSource(base_folder));
        }

        let template = match &config.geo_template_path {
            Some(path) => load_template(path)?,
            None => default_template(),
        };
        let roster_path =
            resolve_unique(&base_folder, &format!("g{}*.csv", config.release()))?;
        let locations = GeoRoster::load(&roster_path, template)?;
        let block_groups = repair_block_groups(&locations)?;

        if !config.geometry_dir.is_dir() {
            return Err(CensusError::MissingSource(config.geometry_dir.clone()));
        }
        let geometry_path =
            BoundaryGeometry::locate(&config.geometry_dir, config.year, &info.fips)?;
        let geometry = BoundaryGeometry::load(&geometry_path)?;

        info!(
            state = %info.name,
            roster = locations.len(),
            block_groups = block_groups.len(),
            features = geometry.len(),
            "state context ready"
        );

        let sequences = SequenceLoader::new(&base_folder, config.release());
        Ok(Self {
            info,
            catalog,
            config: config.clone(),
            base_folder,
            locations,
            block_groups,
            geometry,
            sequences,
        })
    }

    pub fn info(&self) -> &StateInfo {
        &self.info
    }

    pub fn base_folder(&self) -> &Path {
        &self.base_folder
    }

    /// The full geography roster as read from disk.
    pub fn locations(&self) -> &GeoRoster {
        &self.locations
    }

    pub fn block_groups(&self) -> &[BlockGroup] {
        &self.block_groups
    }

    pub fn geometry(&self) -> &BoundaryGeometry {
        &self.geometry
    }

    pub fn get_sequence(&self, sequence: u32) -> Result<SequenceFrame> {
        self.sequences.load(sequence)
    }

    #[instrument(level = "info", skip(self), fields(state = %self.info.abbr))]
    pub fn get_table(&self, table_id: &str) -> Result<ExtractedTable> {
        let spec = self.catalog.resolve(table_id)?;
        let frame = self.get_sequence(spec.sequence)?;
        self.extractor().extract(&spec, &frame)
    }

    /// Like `get_table`, joined to the state's block-group boundaries.
    #[instrument(level = "info", skip(self), fields(state = %self.info.abbr))]
    pub fn get_geo_table(&self, table_id: &str) -> Result<ExtractedTable> {
        let spec = self.catalog.resolve(table_id)?;
        let frame = self.get_sequence(spec.sequence)?;
        GeoTableExtractor::new(self.extractor(), &self.geometry).extract(&spec, &frame)
    }

    fn extractor(&self) -> TableExtractor<'_> {
        TableExtractor::new(&self.block_groups, self.config.join)
    }
}
