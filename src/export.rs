// src/export.rs

use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{
    fs::{self, File},
    io::BufWriter,
    path::Path,
};
use tracing::{info, instrument};

use crate::error::Result;
use crate::extract::ExtractedTable;

/// Write `table` as a Snappy-compressed Parquet file, returning its size in bytes.
///
/// The file is written next to `path` as `<name>.tmp` and renamed on success.
#[instrument(level = "info", skip(table, path), fields(table_id = %table.spec().id, path = %path.as_ref().display()))]
pub fn write_parquet<P: AsRef<Path>>(table: &ExtractedTable, path: P) -> Result<u64> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);

    let batch = table.batch();
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let file = File::create(tmp_path)?;
    let mut writer = ArrowWriter::try_new(BufWriter::new(file), batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;

    fs::rename(tmp_path, path)?;
    let bytes = fs::metadata(path)?.len();
    info!(rows = batch.num_rows(), bytes, "wrote parquet");
    Ok(bytes)
}
