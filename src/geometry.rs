// src/geometry.rs

use serde::Deserialize;
use serde_json::{json, Map, Value};
use shapefile::dbase::{self, FieldValue};
use shapefile::{PolygonRing, Shape, ShapeReader};
use std::{
    fs::{self, File},
    io::{BufReader, Cursor, Read, Seek},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};
use zip::ZipArchive;

use crate::error::{CensusError, Result};

/// Boundary file extensions in the order they are preferred.
pub const BOUNDARY_EXTENSIONS: [&str; 4] = ["zip", "shp", "geojson", "json"];

/// A boundary polygon keyed by its 12-digit block-group GEOID.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFeature {
    pub geoid: String,
    /// GeoJSON geometry object; `None` for features published without one.
    pub geometry: Option<Value>,
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    geometry: Option<Value>,
}

/// Block-group boundaries for one state, in source order.
#[derive(Debug, Clone, Default)]
pub struct BoundaryGeometry {
    features: Vec<BoundaryFeature>,
}

impl BoundaryGeometry {
    /// File stem of a state's TIGER block-group boundaries, e.g. `tl_2018_06_bg`.
    pub fn file_stem(year: u16, fips: &str) -> String {
        format!("tl_{}_{}_bg", year, fips)
    }

    /// The boundary file for a state in `dir`, taking the first extension of
    /// [`BOUNDARY_EXTENSIONS`] that exists.
    pub fn locate(dir: &Path, year: u16, fips: &str) -> Result<PathBuf> {
        let stem = Self::file_stem(year, fips);
        BOUNDARY_EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{}.{}", stem, ext)))
            .find(|p| p.is_file())
            .ok_or_else(|| CensusError::FileResolution {
                pattern: format!(
                    "{}/{}.{{{}}}",
                    dir.display(),
                    stem,
                    BOUNDARY_EXTENSIONS.join(",")
                ),
                found: 0,
            })
    }

    /// Load a TIGER shapefile ZIP, a bare `.shp` with its `.dbf` alongside,
    /// or GeoJSON (plain or as the only GeoJSON entry of a ZIP).
    #[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let geometry = match ext.as_str() {
            "zip" => Self::from_zip(File::open(path)?, &path.display().to_string())?,
            "shp" => {
                let dbf = path.with_extension("dbf");
                if !dbf.is_file() {
                    return Err(CensusError::MissingSource(dbf));
                }
                Self::from_shapefile(fs::read(path)?, fs::read(&dbf)?)?
            }
            "geojson" | "json" => Self::from_geojson_reader(BufReader::new(File::open(path)?))?,
            _ => return Err(CensusError::parse("geometry source format", ext.clone())),
        };
        info!(features = geometry.len(), "loaded boundary geometry");
        Ok(geometry)
    }

    /// Read a ZIP holding either one shapefile (`.shp` plus `.dbf`) or one
    /// GeoJSON document. A shapefile wins when both are present.
    pub fn from_zip<R: Read + Seek>(reader: R, label: &str) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let names: Vec<String> = archive
            .file_names()
            .filter(|n| !n.ends_with('/'))
            .map(str::to_string)
            .collect();

        let shps = with_extension(&names, &[".shp"]);
        if !shps.is_empty() {
            if shps.len() != 1 {
                return Err(CensusError::FileResolution {
                    pattern: format!("{}:*.shp", label),
                    found: shps.len(),
                });
            }
            let shp_name = shps[0];
            let stem = &shp_name[..shp_name.len() - ".shp".len()];
            let dbf_name = names
                .iter()
                .find(|n| {
                    n.len() == shp_name.len()
                        && n.starts_with(stem)
                        && n[stem.len()..].eq_ignore_ascii_case(".dbf")
                })
                .ok_or_else(|| {
                    CensusError::MissingSource(PathBuf::from(format!("{}:{}.dbf", label, stem)))
                })?;
            debug!(shp = %shp_name, dbf = %dbf_name, "reading shapefile from archive");
            let shp = read_entry(&mut archive, shp_name)?;
            let dbf = read_entry(&mut archive, dbf_name)?;
            return Self::from_shapefile(shp, dbf);
        }

        let candidates = with_extension(&names, &[".geojson", ".json"]);
        if candidates.len() != 1 {
            return Err(CensusError::FileResolution {
                pattern: format!("{}:*.{{shp,geojson,json}}", label),
                found: candidates.len(),
            });
        }
        let buf = read_entry(&mut archive, candidates[0])?;
        Self::from_geojson_reader(buf.as_slice())
    }

    /// Pair each polygon of a `.shp` with its `.dbf` attribute record.
    /// Records without a GEOID cannot be joined and are skipped.
    pub fn from_shapefile(shp: Vec<u8>, dbf: Vec<u8>) -> Result<Self> {
        let shapes = ShapeReader::new(Cursor::new(shp))?;
        let records = dbase::Reader::new(Cursor::new(dbf))?;
        let mut reader = shapefile::Reader::new(shapes, records);

        let mut features = Vec::new();
        let mut skipped = 0usize;
        for pair in reader.iter_shapes_and_records() {
            let (shape, record) = pair?;
            let geoid = match record.get("GEOID") {
                Some(FieldValue::Character(Some(s))) if !s.trim().is_empty() => {
                    s.trim().to_string()
                }
                _ => {
                    skipped += 1;
                    continue;
                }
            };
            features.push(BoundaryFeature {
                geoid,
                geometry: shape_to_geojson(&shape)?,
            });
        }
        if skipped > 0 {
            warn!(skipped, "boundary records without GEOID");
        }
        Ok(Self { features })
    }

    /// Parse a GeoJSON `FeatureCollection`. Features without a GEOID property
    /// cannot be joined and are skipped.
    pub fn from_geojson_reader<R: Read>(reader: R) -> Result<Self> {
        let collection: FeatureCollection = serde_json::from_reader(reader)?;
        let mut skipped = 0usize;
        let features: Vec<BoundaryFeature> = collection
            .features
            .into_iter()
            .filter_map(|f| {
                let geoid = match f.properties.as_ref().and_then(|p| p.get("GEOID")) {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    _ => {
                        skipped += 1;
                        return None;
                    }
                };
                Some(BoundaryFeature {
                    geoid,
                    geometry: f.geometry,
                })
            })
            .collect();
        if skipped > 0 {
            warn!(skipped, "boundary features without GEOID");
        }
        Ok(Self { features })
    }

    pub fn features(&self) -> &[BoundaryFeature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl FromIterator<BoundaryFeature> for BoundaryGeometry {
    fn from_iter<I: IntoIterator<Item = BoundaryFeature>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

fn with_extension<'a>(names: &'a [String], exts: &[&str]) -> Vec<&'a String> {
    names
        .iter()
        .filter(|n| {
            let lower = n.to_lowercase();
            exts.iter().any(|e| lower.ends_with(e))
        })
        .collect()
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>> {
    let mut entry = archive.by_name(name)?;
    let mut buf = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Shapefile polygons as GeoJSON. Each outer ring starts a polygon and the
/// inner rings after it are its holes; more than one outer ring makes a MultiPolygon.
fn shape_to_geojson(shape: &Shape) -> Result<Option<Value>> {
    let polygon = match shape {
        Shape::NullShape => return Ok(None),
        Shape::Polygon(polygon) => polygon,
        other => {
            return Err(CensusError::parse(
                "boundary shape type",
                format!("{:?}", other.shapetype()),
            ))
        }
    };

    let mut polygons: Vec<Vec<Vec<[f64; 2]>>> = Vec::new();
    for ring in polygon.rings() {
        let coords: Vec<[f64; 2]> = ring.points().iter().map(|p| [p.x, p.y]).collect();
        match (ring, polygons.last_mut()) {
            (PolygonRing::Inner(_), Some(current)) => current.push(coords),
            _ => polygons.push(vec![coords]),
        }
    }

    Ok(Some(match polygons.len() {
        1 => json!({"type": "Polygon", "coordinates": polygons[0]}),
        _ => json!({"type": "MultiPolygon", "coordinates": polygons}),
    }))
}
