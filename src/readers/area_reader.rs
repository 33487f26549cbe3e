use crate::error::{open_error, ProcessingError, Result};
use crate::models::{Crs, ReferenceArea};
use geo::{Coord, LineString, Polygon};
use serde_json::Value as JsonValue;
use shapefile::{PolygonRing, Shape};
use std::path::Path;
use tracing::{debug, info, warn};

/// Reads a reference area from GeoJSON or an ESRI shapefile.
///
/// GeoJSON may be a `FeatureCollection`, a single `Feature`, a
/// `GeometryCollection` or a bare geometry; its CRS comes from the legacy
/// `crs` member, defaulting to WGS84 (RFC 7946). A shapefile (`.shp`) takes
/// its CRS from the sibling `.prj`. Only polygon geometries are used, and a
/// configured override wins over any declared CRS.
pub struct AreaReader {
    crs_override: Option<Crs>,
}

impl AreaReader {
    pub fn new() -> Self {
        Self { crs_override: None }
    }

    pub fn with_crs_override(crs_override: Option<Crs>) -> Self {
        Self { crs_override }
    }

    pub fn read_area(&self, path: &Path) -> Result<ReferenceArea> {
        let mut area = if is_shapefile(path) {
            self.read_shapefile(path)?
        } else {
            let text = std::fs::read_to_string(path).map_err(|e| open_error(e, path))?;
            self.parse_str(&text)?
        };
        if area.name.is_none() {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                area = area.with_name(stem);
            }
        }

        info!(
            path = %path.display(),
            polygons = area.polygon_count(),
            crs = %area.crs,
            "Loaded reference area"
        );
        Ok(area)
    }

    pub fn parse_str(&self, text: &str) -> Result<ReferenceArea> {
        let root: JsonValue = serde_json::from_str(text)?;

        let crs = match self.crs_override {
            Some(crs) => crs,
            None => declared_crs(&root)?.unwrap_or_else(|| {
                debug!("Area has no CRS declaration, assuming WGS84");
                Crs::Wgs84
            }),
        };

        let mut collector = PolygonCollector::default();
        collector.visit(&root)?;

        if collector.skipped > 0 {
            warn!(
                skipped = collector.skipped,
                "Ignored non-polygon geometries in reference area"
            );
        }
        if collector.polygons.is_empty() {
            return Err(ProcessingError::Geometry(
                "Reference area contains no Polygon or MultiPolygon geometries".to_string(),
            ));
        }

        let mut area = ReferenceArea::new(collector.polygons, crs);
        if let Some(name) = root.get("name").and_then(JsonValue::as_str) {
            area = area.with_name(name);
        }
        Ok(area)
    }
}

impl AreaReader {
    fn read_shapefile(&self, path: &Path) -> Result<ReferenceArea> {
        if !path.exists() {
            return Err(ProcessingError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let crs = match self.crs_override {
            Some(crs) => crs,
            None => prj_crs(path)?,
        };

        let mut polygons = Vec::new();
        let mut skipped = 0;
        for shape in shapefile::read_shapes(path)? {
            match shape {
                Shape::Polygon(polygon) => {
                    polygons.extend(rings_to_polygons(polygon.rings(), |p| Coord { x: p.x, y: p.y }))
                }
                Shape::PolygonM(polygon) => {
                    polygons.extend(rings_to_polygons(polygon.rings(), |p| Coord { x: p.x, y: p.y }))
                }
                Shape::PolygonZ(polygon) => {
                    polygons.extend(rings_to_polygons(polygon.rings(), |p| Coord { x: p.x, y: p.y }))
                }
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!(skipped, "Ignored non-polygon shapes in reference area");
        }
        if polygons.is_empty() {
            return Err(ProcessingError::Geometry(format!(
                "Shapefile {} contains no polygons",
                path.display()
            )));
        }
        Ok(ReferenceArea::new(polygons, crs))
    }
}

fn is_shapefile(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("shp"))
}

/// CRS declared by the `.prj` next to a shapefile
fn prj_crs(shp_path: &Path) -> Result<Crs> {
    let prj_path = shp_path.with_extension("prj");
    let wkt = std::fs::read_to_string(&prj_path).map_err(|e| {
        ProcessingError::Crs(format!(
            "Cannot read projection file {}: {}",
            prj_path.display(),
            e
        ))
    })?;
    Crs::from_wkt(&wkt)
}

/// Group shapefile rings into polygons: each outer ring starts a polygon and
/// the inner rings that follow are its holes.
fn rings_to_polygons<P>(
    rings: &[PolygonRing<P>],
    to_coord: impl Fn(&P) -> Coord<f64>,
) -> Vec<Polygon<f64>> {
    let mut polygons: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();
    for ring in rings {
        let line: LineString<f64> = ring.points().iter().map(&to_coord).collect();
        match ring {
            PolygonRing::Outer(_) => polygons.push((line, Vec::new())),
            PolygonRing::Inner(_) => match polygons.last_mut() {
                Some((_, holes)) => holes.push(line),
                None => polygons.push((line, Vec::new())),
            },
        }
    }

    polygons
        .into_iter()
        .map(|(exterior, holes)| Polygon::new(exterior, holes))
        .collect()
}

impl Default for AreaReader {
    fn default() -> Self {
        Self::new()
    }
}

/// `crs.properties.name` of a GeoJSON root, if the member exists
fn declared_crs(root: &JsonValue) -> Result<Option<Crs>> {
    let Some(crs) = root.get("crs") else {
        return Ok(None);
    };
    if crs.is_null() {
        return Ok(None);
    }

    let name = crs
        .get("properties")
        .and_then(|p| p.get("name"))
        .and_then(JsonValue::as_str)
        .ok_or_else(|| {
            ProcessingError::Crs(format!("Unreadable CRS member in reference area: {}", crs))
        })?;
    name.parse::<Crs>().map(Some)
}

#[derive(Default)]
struct PolygonCollector {
    polygons: Vec<Polygon<f64>>,
    skipped: usize,
}

impl PolygonCollector {
    fn visit(&mut self, node: &JsonValue) -> Result<()> {
        let kind = node
            .get("type")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| ProcessingError::InvalidFormat("GeoJSON object without 'type'".into()))?;

        match kind {
            "FeatureCollection" => {
                let features = node
                    .get("features")
                    .and_then(JsonValue::as_array)
                    .ok_or_else(|| {
                        ProcessingError::InvalidFormat("FeatureCollection without 'features'".into())
                    })?;
                for feature in features {
                    self.visit(feature)?;
                }
            }
            "Feature" => match node.get("geometry") {
                Some(geometry) if !geometry.is_null() => self.visit(geometry)?,
                _ => self.skipped += 1,
            },
            "GeometryCollection" => {
                let geometries = node
                    .get("geometries")
                    .and_then(JsonValue::as_array)
                    .ok_or_else(|| {
                        ProcessingError::InvalidFormat(
                            "GeometryCollection without 'geometries'".into(),
                        )
                    })?;
                for geometry in geometries {
                    self.visit(geometry)?;
                }
            }
            "Polygon" => {
                let rings = coordinates(node)?;
                self.polygons.push(parse_polygon(rings)?);
            }
            "MultiPolygon" => {
                let parts = coordinates(node)?.as_array().ok_or_else(|| {
                    ProcessingError::Geometry("MultiPolygon coordinates must be an array".into())
                })?;
                for part in parts {
                    self.polygons.push(parse_polygon(part)?);
                }
            }
            "Point" | "MultiPoint" | "LineString" | "MultiLineString" => self.skipped += 1,
            other => {
                return Err(ProcessingError::InvalidFormat(format!(
                    "Unknown GeoJSON type '{}'",
                    other
                )))
            }
        }
        Ok(())
    }
}

fn coordinates(node: &JsonValue) -> Result<&JsonValue> {
    node.get("coordinates")
        .ok_or_else(|| ProcessingError::Geometry("Geometry without 'coordinates'".into()))
}

fn parse_polygon(rings: &JsonValue) -> Result<Polygon<f64>> {
    let rings = rings
        .as_array()
        .ok_or_else(|| ProcessingError::Geometry("Polygon rings must be an array".into()))?;
    let mut rings = rings.iter().map(parse_ring);

    let exterior = rings
        .next()
        .ok_or_else(|| ProcessingError::Geometry("Polygon without exterior ring".into()))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn parse_ring(ring: &JsonValue) -> Result<LineString<f64>> {
    let positions = ring
        .as_array()
        .ok_or_else(|| ProcessingError::Geometry("Ring must be an array of positions".into()))?;

    let coords = positions
        .iter()
        .map(|position| {
            let x = position.get(0).and_then(JsonValue::as_f64);
            let y = position.get(1).and_then(JsonValue::as_f64);
            match (x, y) {
                (Some(x), Some(y)) => Ok(Coord { x, y }),
                _ => Err(ProcessingError::Geometry(format!(
                    "Invalid position {}",
                    position
                ))),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    if coords.len() < 3 {
        return Err(ProcessingError::Geometry(format!(
            "Ring has {} positions, at least 3 are required",
            coords.len()
        )));
    }
    Ok(LineString::new(coords))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SQUARE_RD: &str = r#"{
        "type": "FeatureCollection",
        "name": "amstel",
        "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::28992" } },
        "features": [
            { "type": "Feature", "properties": {},
              "geometry": { "type": "Polygon",
                "coordinates": [[[120000, 480000], [121000, 480000], [121000, 481000], [120000, 481000], [120000, 480000]]] } },
            { "type": "Feature", "properties": {},
              "geometry": { "type": "LineString", "coordinates": [[0, 0], [1, 1]] } },
            { "type": "Feature", "properties": {}, "geometry": null }
        ]
    }"#;

    #[test]
    fn test_feature_collection_with_declared_crs() {
        let area = AreaReader::new().parse_str(SQUARE_RD).unwrap();
        assert_eq!(area.crs, Crs::RdNew);
        assert_eq!(area.polygon_count(), 1);
        assert_eq!(area.name.as_deref(), Some("amstel"));
    }

    #[test]
    fn test_bare_multipolygon_defaults_to_wgs84() {
        let area = AreaReader::new()
            .parse_str(
                r#"{"type":"MultiPolygon","coordinates":[
                    [[[4.9,52.3],[4.91,52.3],[4.91,52.31],[4.9,52.3]]],
                    [[[5.0,52.0],[5.1,52.0],[5.1,52.1],[5.0,52.0]]]
                ]}"#,
            )
            .unwrap();
        assert_eq!(area.crs, Crs::Wgs84);
        assert_eq!(area.polygon_count(), 2);
    }

    #[test]
    fn test_crs_override_wins() {
        let area = AreaReader::with_crs_override(Some(Crs::Wgs84))
            .parse_str(SQUARE_RD)
            .unwrap();
        assert_eq!(area.crs, Crs::Wgs84);
    }

    #[test]
    fn test_unsupported_crs_is_crs_error() {
        let text = SQUARE_RD.replace("urn:ogc:def:crs:EPSG::28992", "EPSG:3857");
        assert!(matches!(
            AreaReader::new().parse_str(&text),
            Err(ProcessingError::Crs(_))
        ));
    }

    #[test]
    fn test_no_polygons_is_geometry_error() {
        let result = AreaReader::new()
            .parse_str(r#"{"type":"LineString","coordinates":[[4.9,52.3],[4.91,52.3]]}"#);
        assert!(matches!(result, Err(ProcessingError::Geometry(_))));
    }

    #[test]
    fn test_read_area_file_named_after_stem() -> Result<()> {
        let mut file = tempfile::Builder::new()
            .prefix("river")
            .suffix(".geojson")
            .tempfile()?;
        write!(
            file,
            r#"{{"type":"Polygon","coordinates":[[[4.9,52.3],[4.91,52.3],[4.91,52.31],[4.9,52.3]]]}}"#
        )?;

        let area = AreaReader::new().read_area(file.path())?;
        assert!(area.name.unwrap().starts_with("river"));
        Ok(())
    }

    fn write_square_shapefile(dir: &Path, prj: Option<&str>) -> std::path::PathBuf {
        let path = dir.join("amstel.shp");
        let square = shapefile::Polygon::new(PolygonRing::Outer(vec![
            shapefile::Point::new(120_000.0, 480_000.0),
            shapefile::Point::new(120_000.0, 481_000.0),
            shapefile::Point::new(121_000.0, 481_000.0),
            shapefile::Point::new(121_000.0, 480_000.0),
            shapefile::Point::new(120_000.0, 480_000.0),
        ]));
        shapefile::ShapeWriter::from_path(&path)
            .unwrap()
            .write_shapes(&vec![square])
            .unwrap();
        if let Some(prj) = prj {
            std::fs::write(path.with_extension("prj"), prj).unwrap();
        }
        path
    }

    #[test]
    fn test_read_shapefile_with_prj() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = write_square_shapefile(
            dir.path(),
            Some(r#"PROJCS["RD_New",GEOGCS["GCS_Amersfoort",DATUM["D_Amersfoort",SPHEROID["Bessel_1841",6377397.155,299.1528128]]],PROJECTION["Double_Stereographic"],UNIT["Meter",1.0]]"#),
        );

        let area = AreaReader::new().read_area(&path)?;
        assert_eq!(area.crs, Crs::RdNew);
        assert_eq!(area.polygon_count(), 1);
        assert_eq!(area.name.as_deref(), Some("amstel"));
        Ok(())
    }

    #[test]
    fn test_shapefile_needs_known_prj() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_square_shapefile(dir.path(), None);
        assert!(matches!(
            AreaReader::new().read_area(&path),
            Err(ProcessingError::Crs(_))
        ));
        assert_eq!(
            AreaReader::with_crs_override(Some(Crs::RdNew))
                .read_area(&path)
                .unwrap()
                .crs,
            Crs::RdNew
        );

        std::fs::write(path.with_extension("prj"), r#"PROJCS["Lambert_72"]"#).unwrap();
        assert!(matches!(
            AreaReader::new().read_area(&path),
            Err(ProcessingError::Crs(_))
        ));
    }

    #[test]
    fn test_missing_area_file() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().with_extension("gone.geojson");
        assert!(matches!(
            AreaReader::new().read_area(&path),
            Err(ProcessingError::FileNotFound { .. })
        ));
    }
}
