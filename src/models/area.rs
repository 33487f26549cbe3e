use crate::error::{ProcessingError, Result};
use crate::utils::constants::{EPSG_RD_NEW, EPSG_WGS84};
use crate::utils::coordinates::{is_within_rd_domain, rd_to_wgs84, wgs84_to_rd};
use geo::{Coord, MapCoords, MultiPolygon, Polygon};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Coordinate reference systems the pipeline can work in.
///
/// Coordinates are always `x` = longitude/easting, `y` = latitude/northing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Crs {
    /// WGS84 geographic degrees (EPSG:4326)
    Wgs84,
    /// Amersfoort / RD New, meters (EPSG:28992)
    RdNew,
}

impl Crs {
    pub fn from_epsg(code: u32) -> Result<Self> {
        match code {
            EPSG_WGS84 => Ok(Crs::Wgs84),
            EPSG_RD_NEW => Ok(Crs::RdNew),
            other => Err(ProcessingError::Crs(format!(
                "Unsupported CRS EPSG:{} (supported: EPSG:{}, EPSG:{})",
                other, EPSG_WGS84, EPSG_RD_NEW
            ))),
        }
    }

    pub fn epsg(&self) -> u32 {
        match self {
            Crs::Wgs84 => EPSG_WGS84,
            Crs::RdNew => EPSG_RD_NEW,
        }
    }

    /// Whether coordinates are in meters on a projected grid
    pub fn is_projected(&self) -> bool {
        matches!(self, Crs::RdNew)
    }

    /// Transform one coordinate into `target`
    pub fn transform(&self, target: Crs, coord: Coord<f64>) -> Result<Coord<f64>> {
        match (*self, target) {
            (Crs::Wgs84, Crs::RdNew) => {
                if !is_within_rd_domain(coord.y, coord.x) {
                    return Err(ProcessingError::Crs(format!(
                        "Position (lat {}, lon {}) is outside the EPSG:{} domain",
                        coord.y, coord.x, EPSG_RD_NEW
                    )));
                }
                let (x, y) = wgs84_to_rd(coord.y, coord.x);
                Ok(Coord { x, y })
            }
            (Crs::RdNew, Crs::Wgs84) => {
                let (lat, lon) = rd_to_wgs84(coord.x, coord.y);
                Ok(Coord { x: lon, y: lat })
            }
            _ => Ok(coord),
        }
    }
}

impl FromStr for Crs {
    type Err = ProcessingError;

    /// Accepts `EPSG:<code>`, OGC URNs such as `urn:ogc:def:crs:EPSG::28992`, and `CRS84`.
    fn from_str(declaration: &str) -> Result<Self> {
        let upper = declaration.trim().to_uppercase();
        if upper.is_empty() {
            return Err(ProcessingError::Crs("Empty CRS declaration".to_string()));
        }
        if upper.ends_with("CRS84") || upper == "WGS84" {
            return Ok(Crs::Wgs84);
        }
        if !upper.contains("EPSG") {
            return Err(ProcessingError::Crs(format!(
                "Unrecognised CRS declaration '{}'",
                declaration
            )));
        }

        let code = upper
            .rsplit(':')
            .next()
            .and_then(|c| c.parse::<u32>().ok())
            .ok_or_else(|| {
                ProcessingError::Crs(format!("Invalid EPSG declaration '{}'", declaration))
            })?;
        Crs::from_epsg(code)
    }
}

impl Crs {
    /// Identify the CRS described by WKT, as found in an ESRI `.prj` file.
    ///
    /// An EPSG `AUTHORITY` (or `ID`) clause decides when present; the last one
    /// belongs to the outermost definition. Otherwise the definition is
    /// recognised by name.
    pub fn from_wkt(wkt: &str) -> Result<Self> {
        let upper = wkt.trim().to_uppercase();
        if upper.is_empty() {
            return Err(ProcessingError::Crs("Empty projection definition".to_string()));
        }

        if let Some(code) = last_epsg_code(&upper) {
            return Crs::from_epsg(code);
        }

        let compact: String = upper.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
        let projected = upper.starts_with("PROJCS") || upper.starts_with("PROJCRS");
        let geographic = upper.starts_with("GEOGCS") || upper.starts_with("GEOGCRS");
        if projected && compact.contains("RDNEW") {
            return Ok(Crs::RdNew);
        }
        if geographic && (compact.contains("WGS1984") || compact.contains("WGS84")) {
            return Ok(Crs::Wgs84);
        }

        Err(ProcessingError::Crs(format!(
            "Unsupported projection definition '{}'",
            wkt.chars().take(80).collect::<String>()
        )))
    }
}

/// Code of the last `AUTHORITY["EPSG","n"]` or `ID["EPSG",n]` clause
fn last_epsg_code(upper_wkt: &str) -> Option<u32> {
    let start = upper_wkt
        .rfind("AUTHORITY[\"EPSG\"")
        .or_else(|| upper_wkt.rfind("ID[\"EPSG\""))?;
    let rest = &upper_wkt[start..];
    let clause = &rest[..rest.find(']')?];
    let code = clause.split(',').nth(1)?;
    code.trim().trim_matches('"').parse().ok()
}

impl TryFrom<String> for Crs {
    type Error = ProcessingError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

/// Polygon area (e.g. a river course) used as the proximity reference
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceArea {
    pub name: Option<String>,
    pub crs: Crs,
    polygons: MultiPolygon<f64>,
}

impl ReferenceArea {
    pub fn new(polygons: Vec<Polygon<f64>>, crs: Crs) -> Self {
        Self {
            name: None,
            crs,
            polygons: MultiPolygon::new(polygons),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// All polygons merged into one geometry
    pub fn unified(&self) -> &MultiPolygon<f64> {
        &self.polygons
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.0.is_empty()
    }

    /// The unified geometry reprojected into `target`
    pub fn to_crs(&self, target: Crs) -> Result<MultiPolygon<f64>> {
        let source = self.crs;
        self.polygons
            .try_map_coords(|coord| source.transform(target, coord))
    }
}
