pub mod catalog;
pub mod spec;

pub use catalog::{CatalogRow, LookupCatalog};
pub use spec::TableSpec;
