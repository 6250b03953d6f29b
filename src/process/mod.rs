pub mod convert;
pub mod repair;
pub mod roster;
pub mod sequence;
pub mod utils;

pub use repair::{geoid12, repair_block_groups, BlockGroup};
pub use roster::GeoRoster;
pub use sequence::{SequenceFrame, SequenceLoader};
