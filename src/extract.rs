// src/extract.rs

use arrow::{
    array::{Array, ArrayRef, StringArray, UInt32Array},
    compute::take,
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tracing::{debug, instrument, warn};

use crate::config::JoinPolicy;
use crate::error::{CensusError, Result};
use crate::geometry::BoundaryGeometry;
use crate::lookup::TableSpec;
use crate::process::{convert, repair::BlockGroup, sequence::SequenceFrame};

/// One census table for one state, keyed by geography.
#[derive(Debug, Clone)]
pub struct ExtractedTable {
    spec: TableSpec,
    batch: RecordBatch,
    dropped: usize,
}

impl ExtractedTable {
    pub fn spec(&self) -> &TableSpec {
        &self.spec
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Rows lost because a join found no partner.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.batch.column_by_name(name)
    }
}

/// Slices a table's columns out of a sequence frame and attaches block-group identifiers.
#[derive(Debug, Clone, Copy)]
pub struct TableExtractor<'a> {
    block_groups: &'a [BlockGroup],
    policy: JoinPolicy,
}

impl<'a> TableExtractor<'a> {
    pub fn new(block_groups: &'a [BlockGroup], policy: JoinPolicy) -> Self {
        Self {
            block_groups,
            policy,
        }
    }

    /// Output columns: the table's cells under their published titles, then
    /// GEOID12, NAME, STATE, COUNTY, TRACT, BLKGRP. Sequence rows without a
    /// block group are dropped unless the policy is strict.
    #[instrument(level = "debug", skip(self, spec, frame), fields(table = %spec.id))]
    pub fn extract(&self, spec: &TableSpec, frame: &SequenceFrame) -> Result<ExtractedTable> {
        let mut by_logrecno: HashMap<u32, usize> = HashMap::with_capacity(self.block_groups.len());
        for (i, bg) in self.block_groups.iter().enumerate() {
            by_logrecno.entry(bg.logrecno).or_insert(i);
        }

        let logrecnos = frame.logrecnos()?;
        let mut rows = Vec::with_capacity(logrecnos.len());
        let mut matched: Vec<&BlockGroup> = Vec::with_capacity(logrecnos.len());
        for (row, key) in logrecnos.iter().enumerate() {
            if let Some(&i) = by_logrecno.get(key) {
                rows.push(row as u32);
                matched.push(&self.block_groups[i]);
            }
        }

        let dropped = logrecnos.len() - rows.len();
        if dropped > 0 {
            if self.policy == JoinPolicy::Strict {
                return Err(CensusError::UnmatchedRecords {
                    table_id: spec.id.clone(),
                    count: dropped,
                });
            }
            warn!(table = %spec.id, dropped, "sequence rows without a block group");
        }

        let rows = UInt32Array::from(rows);
        let mut fields = Vec::with_capacity(spec.column_indices.len() + 6);
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(fields.capacity());

        for (title, &index) in spec.column_titles.iter().zip(&spec.column_indices) {
            let estimates = convert::to_estimates(&frame.column(index)?);
            columns.push(take(&estimates, &rows, None)?);
            fields.push(Field::new(title, DataType::Float64, true));
        }

        fields.push(Field::new("GEOID12", DataType::Utf8, false));
        columns.push(Arc::new(StringArray::from_iter_values(
            matched.iter().map(|bg| bg.geoid12.as_str()),
        )));
        fields.push(Field::new("NAME", DataType::Utf8, false));
        columns.push(Arc::new(StringArray::from_iter_values(
            matched.iter().map(|bg| bg.name.as_str()),
        )));
        let fips: [(&str, Vec<u32>); 4] = [
            ("STATE", matched.iter().map(|bg| bg.state).collect()),
            ("COUNTY", matched.iter().map(|bg| bg.county).collect()),
            ("TRACT", matched.iter().map(|bg| bg.tract).collect()),
            ("BLKGRP", matched.iter().map(|bg| bg.blkgrp).collect()),
        ];
        for (name, values) in fips {
            fields.push(Field::new(name, DataType::UInt32, false));
            columns.push(Arc::new(UInt32Array::from(values)));
        }

        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
        debug!(rows = batch.num_rows(), dropped, "extracted table");
        Ok(ExtractedTable {
            spec: spec.clone(),
            batch,
            dropped,
        })
    }
}

/// `TableExtractor` followed by a join against boundary polygons.
#[derive(Debug, Clone, Copy)]
pub struct GeoTableExtractor<'a> {
    table: TableExtractor<'a>,
    boundaries: &'a BoundaryGeometry,
}

impl<'a> GeoTableExtractor<'a> {
    pub fn new(table: TableExtractor<'a>, boundaries: &'a BoundaryGeometry) -> Self {
        Self { table, boundaries }
    }

    pub fn extract(&self, spec: &TableSpec, frame: &SequenceFrame) -> Result<ExtractedTable> {
        let table = self.table.extract(spec, frame)?;
        join_boundaries(table, self.boundaries)
    }
}

/// Inner join of boundary features (GEOID) with a table (GEOID12), in feature order.
///
/// Output columns are GEOID, geometry (GeoJSON text) and then the table's columns.
/// If GEOID12 repeats within the table, every feature joins the first such row.
pub fn join_boundaries(table: ExtractedTable, boundaries: &BoundaryGeometry) -> Result<ExtractedTable> {
    let geoid12 = table
        .column("GEOID12")
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| CensusError::MissingColumn("GEOID12".into()))?;

    let mut by_geoid: HashMap<&str, usize> = HashMap::with_capacity(geoid12.len());
    for (row, value) in geoid12.iter().enumerate() {
        if let Some(v) = value {
            by_geoid.entry(v).or_insert(row);
        }
    }

    let mut feature_ids = Vec::new();
    let mut geometries = Vec::new();
    let mut rows = Vec::new();
    for feature in boundaries.features() {
        if let Some(&row) = by_geoid.get(feature.geoid.as_str()) {
            feature_ids.push(feature.geoid.as_str());
            geometries.push(
                feature
                    .geometry
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
            );
            rows.push(row as u32);
        }
    }

    let kept: HashSet<u32> = rows.iter().copied().collect();
    let dropped = table.num_rows() - kept.len();
    if dropped > 0 {
        debug!(table = %table.spec.id, dropped, "rows without a boundary feature");
    }

    let rows = UInt32Array::from(rows);
    let mut fields = vec![
        Arc::new(Field::new("GEOID", DataType::Utf8, false)),
        Arc::new(Field::new("geometry", DataType::Utf8, true)),
    ];
    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(feature_ids)),
        Arc::new(StringArray::from(geometries)),
    ];
    let schema = table.batch.schema();
    for (field, column) in schema.fields().iter().zip(table.batch.columns()) {
        fields.push(field.clone());
        columns.push(take(column.as_ref(), &rows, None)?);
    }

    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
    Ok(ExtractedTable {
        spec: table.spec,
        batch,
        dropped: table.dropped + dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundaryFeature;
    use arrow::array::Float64Array;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn b01001() -> TableSpec {
        TableSpec::new(
            "B01001",
            1,
            51,
            2,
            "SEX BY AGE",
            vec!["Total".into(), "Male".into()],
            vec![1, 2],
            BTreeMap::new(),
        )
        .unwrap()
    }

    /// A 52-column sequence frame with `values` at columns 50 and 51.
    fn frame(rows: &[(&str, &str, &str)]) -> SequenceFrame {
        let text: String = rows
            .iter()
            .map(|(logrecno, total, male)| {
                let mut fields = vec!["0".to_string(); 52];
                fields[0] = "ACSSF".into();
                fields[5] = logrecno.to_string();
                fields[50] = total.to_string();
                fields[51] = male.to_string();
                format!("{}\n", fields.join(","))
            })
            .collect();
        SequenceFrame::from_reader("e20185ca0001000.txt", text.as_bytes()).unwrap()
    }

    fn block_group(logrecno: u32, blkgrp: u32) -> BlockGroup {
        BlockGroup {
            logrecno,
            geoid12: format!("06001400100{}", blkgrp),
            geoid: format!("15000US06001400100{}", blkgrp),
            name: format!("Block Group {}", blkgrp),
            state: 6,
            county: 1,
            tract: 400100,
            blkgrp,
        }
    }

    fn f64_col<'a>(table: &'a ExtractedTable, name: &str) -> &'a Float64Array {
        table
            .column(name)
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap()
    }

    fn str_col<'a>(table: &'a ExtractedTable, name: &str) -> &'a StringArray {
        table
            .column(name)
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap()
    }

    #[test]
    fn extracts_single_block_group() {
        let bgs = vec![block_group(1, 1)];
        let table = TableExtractor::new(&bgs, JoinPolicy::Drop)
            .extract(&b01001(), &frame(&[("0001", "100", "45")]))
            .unwrap();

        assert_eq!(table.num_rows(), 1);
        assert_eq!(str_col(&table, "GEOID12").value(0), "060014001001");
        assert_eq!(f64_col(&table, "Total").value(0), 100.0);
        assert_eq!(f64_col(&table, "Male").value(0), 45.0);
        assert!(table.column("LOGRECNO").is_none());

        let names: Vec<String> = table
            .batch()
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(
            names,
            vec!["Total", "Male", "GEOID12", "NAME", "STATE", "COUNTY", "TRACT", "BLKGRP"]
        );
    }

    #[test]
    fn unmatched_rows_are_dropped() {
        let bgs = vec![block_group(2, 2)];
        let table = TableExtractor::new(&bgs, JoinPolicy::Drop)
            .extract(
                &b01001(),
                &frame(&[("0001", "100", "45"), ("0002", "80", "."), ("0003", "1", "1")]),
            )
            .unwrap();
        assert_eq!(table.num_rows(), 1);
        assert_eq!(table.dropped(), 2);
        assert_eq!(str_col(&table, "GEOID12").value(0), "060014001002");
        assert_eq!(f64_col(&table, "Total").value(0), 80.0);
        assert!(f64_col(&table, "Male").is_null(0));
    }

    #[test]
    fn strict_policy_rejects_unmatched_rows() {
        let bgs = vec![block_group(1, 1)];
        let err = TableExtractor::new(&bgs, JoinPolicy::Strict)
            .extract(&b01001(), &frame(&[("0001", "1", "1"), ("0009", "1", "1")]))
            .unwrap_err();
        assert!(matches!(
            err,
            CensusError::UnmatchedRecords { count: 1, .. }
        ));
    }

    #[test]
    fn empty_sequence_file_yields_empty_table() {
        let bgs = vec![block_group(1, 1)];
        let empty = SequenceFrame::from_reader("e20185ca0001000.txt", "".as_bytes()).unwrap();
        let table = TableExtractor::new(&bgs, JoinPolicy::Strict)
            .extract(&b01001(), &empty)
            .unwrap();
        assert_eq!(table.num_rows(), 0);
        assert_eq!(table.dropped(), 0);
        assert_eq!(table.batch().num_columns(), 8);
    }

    #[test]
    fn duplicate_geoids_join_the_first_row() {
        let mut twin = block_group(2, 1);
        twin.name = "Block Group 1 (again)".into();
        let bgs = vec![block_group(1, 1), twin];
        let boundaries: BoundaryGeometry = vec![BoundaryFeature {
            geoid: "060014001001".into(),
            geometry: None,
        }]
        .into_iter()
        .collect();

        let table = GeoTableExtractor::new(TableExtractor::new(&bgs, JoinPolicy::Drop), &boundaries)
            .extract(&b01001(), &frame(&[("1", "10", "4"), ("2", "20", "9")]))
            .unwrap();
        assert_eq!(table.num_rows(), 1);
        assert_eq!(f64_col(&table, "Total").value(0), 10.0);
        assert_eq!(str_col(&table, "NAME").value(0), "Block Group 1");
        assert_eq!(table.dropped(), 1);
    }

    #[test]
    fn columns_beyond_the_file_fail() {
        let spec = TableSpec::new(
            "B99999",
            1,
            60,
            1,
            "TOO FAR",
            vec!["Total".into()],
            vec![1],
            BTreeMap::new(),
        )
        .unwrap();
        let bgs = vec![block_group(1, 1)];
        assert!(matches!(
            TableExtractor::new(&bgs, JoinPolicy::Drop).extract(&spec, &frame(&[("1", "1", "1")])),
            Err(CensusError::ColumnOutOfRange { index: 59, .. })
        ));
    }

    #[test]
    fn geo_join_keeps_only_matching_features() {
        let bgs = vec![block_group(1, 1), block_group(2, 2)];
        let boundaries: BoundaryGeometry = vec![
            BoundaryFeature {
                geoid: "060014001002".into(),
                geometry: Some(json!({"type": "Point", "coordinates": [1, 2]})),
            },
            BoundaryFeature {
                geoid: "060014009999".into(),
                geometry: None,
            },
        ]
        .into_iter()
        .collect();

        let table = GeoTableExtractor::new(TableExtractor::new(&bgs, JoinPolicy::Drop), &boundaries)
            .extract(&b01001(), &frame(&[("1", "10", "4"), ("2", "20", "9")]))
            .unwrap();

        assert_eq!(table.num_rows(), 1);
        assert_eq!(table.dropped(), 1);
        assert_eq!(str_col(&table, "GEOID").value(0), "060014001002");
        assert_eq!(str_col(&table, "GEOID12").value(0), "060014001002");
        assert_eq!(f64_col(&table, "Total").value(0), 20.0);
        let geometry: serde_json::Value =
            serde_json::from_str(str_col(&table, "geometry").value(0)).unwrap();
        assert_eq!(geometry["type"], "Point");
        assert_eq!(table.batch().schema().field(0).name(), "GEOID");
        assert_eq!(table.batch().num_columns(), 10);
    }
}
