pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod geometry;
pub mod lookup;
pub mod process;
pub mod state;
pub mod states;

pub use config::{CensusConfig, JoinPolicy};
pub use error::{CensusError, Result};
pub use extract::{ExtractedTable, GeoTableExtractor, TableExtractor};
pub use geometry::{BoundaryFeature, BoundaryGeometry};
pub use lookup::{LookupCatalog, TableSpec};
pub use process::repair::BlockGroup;
pub use state::StateContext;
pub use states::{StateInfo, StateResolver, UsStates};
