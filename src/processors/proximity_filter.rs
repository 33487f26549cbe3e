use crate::error::{ProcessingError, Result};
use crate::models::{Cell, Crs, ReferenceArea, Table};
use crate::settings::ProximitySettings;
use crate::utils::constants::DISTANCE_TOLERANCE_METERS;
use crate::utils::coordinates::validate_wgs84_coordinates;
use geo::{Coord, EuclideanDistance, Intersects, MultiPolygon, Point};
use tracing::{debug, info};

/// Result of a proximity query. An empty `points` table is a valid answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityOutcome {
    pub points: Table,
    pub total_points: usize,
    pub unlocated_points: usize,
    pub distance_meters: f64,
}

impl ProximityOutcome {
    pub fn matched(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str("=== Proximity Filter ===\n");
        summary.push_str(&format!("Search Distance: {} m\n", self.distance_meters));
        summary.push_str(&format!("Original Points: {}\n", self.total_points));
        summary.push_str(&format!("Unlocated Points: {}\n", self.unlocated_points));
        summary.push_str(&format!("Points Within Distance: {}\n", self.matched()));
        summary
    }
}

/// Selects point records lying within a distance of a reference area.
///
/// Distances are evaluated in a projected metric CRS; returned rows keep
/// their original columns and coordinates.
pub struct ProximityFilter {
    lat_column: String,
    lon_column: String,
    points_crs: Crs,
    metric_crs: Crs,
}

impl ProximityFilter {
    pub fn new(settings: &ProximitySettings) -> Self {
        Self {
            lat_column: settings.lat_column.clone(),
            lon_column: settings.lon_column.clone(),
            points_crs: settings.points_crs,
            metric_crs: settings.metric_crs,
        }
    }

    pub fn filter_near(
        &self,
        points: &Table,
        area: &ReferenceArea,
        distance_meters: f64,
    ) -> Result<ProximityOutcome> {
        if !distance_meters.is_finite() || distance_meters < 0.0 {
            return Err(ProcessingError::Config(format!(
                "Distance must be a non-negative number of meters, got {}",
                distance_meters
            )));
        }
        if !self.metric_crs.is_projected() {
            return Err(ProcessingError::Crs(format!(
                "{} is geographic; distances need a projected CRS",
                self.metric_crs
            )));
        }
        if area.is_empty() {
            return Err(ProcessingError::Geometry(
                "Reference area contains no polygons".to_string(),
            ));
        }

        let lat_index = points.require_column(&self.lat_column, "point latitude")?;
        let lon_index = points.require_column(&self.lon_column, "point longitude")?;

        let buffer_base = area.to_crs(self.metric_crs).map_err(|e| {
            ProcessingError::Crs(format!(
                "Could not reproject reference area from {} to {}: {}",
                area.crs, self.metric_crs, e
            ))
        })?;

        info!(
            distance_meters,
            polygons = area.polygon_count(),
            crs = %self.metric_crs,
            "Filtering points near the reference area"
        );

        let mut selected = Vec::new();
        let mut unlocated = 0;
        for (row_index, row) in points.rows().iter().enumerate() {
            let Some(position) = self.locate(&row[lat_index], &row[lon_index]) else {
                unlocated += 1;
                debug!(row = row_index, "Point has no usable coordinates");
                continue;
            };

            // Edges are straight in the area's own CRS but curve slightly once
            // projected, so boundary contact is decided before reprojection.
            let on_area = self
                .points_crs
                .transform(area.crs, position)
                .map_or(false, |native| area.unified().intersects(&Point::from(native)));

            match self.points_crs.transform(self.metric_crs, position) {
                Ok(metric) => {
                    if on_area || within_buffer(&Point::from(metric), &buffer_base, distance_meters)
                    {
                        selected.push(row_index);
                    }
                }
                Err(_) => {
                    unlocated += 1;
                    debug!(row = row_index, "Point lies outside the projection domain");
                }
            }
        }

        let outcome = ProximityOutcome {
            points: points.take_rows(&selected),
            total_points: points.len(),
            unlocated_points: unlocated,
            distance_meters,
        };
        info!(
            matched = outcome.matched(),
            total = outcome.total_points,
            unlocated,
            "Found points within the specified distance"
        );
        Ok(outcome)
    }

    /// A record's position in the points CRS, if its coordinates are usable
    fn locate(&self, lat: &Cell, lon: &Cell) -> Option<Coord<f64>> {
        let (lat, lon) = (lat.to_number()?, lon.to_number()?);
        if !self.points_crs.is_projected() && validate_wgs84_coordinates(lat, lon).is_err() {
            return None;
        }
        Some(Coord { x: lon, y: lat })
    }
}

impl Default for ProximityFilter {
    fn default() -> Self {
        Self::new(&ProximitySettings::default())
    }
}

/// Membership of the area grown by `distance`: boundary inclusive.
fn within_buffer(point: &Point<f64>, area: &MultiPolygon<f64>, distance: f64) -> bool {
    area.0.iter().any(|polygon| {
        polygon.intersects(point)
            || point.euclidean_distance(polygon) <= distance + DISTANCE_TOLERANCE_METERS
    })
}
