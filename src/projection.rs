//! Geographic to map-illustration projection.
//!
//! The world map on the dashboard is hand drawn, so a plain equirectangular
//! projection lands hubs in the sea. Six reference cities were measured on the
//! illustration; the local error of the two nearest ones is blended with
//! inverse-distance weights and added to the naive projection.

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use thiserror::Error;
use tracing::warn;

use crate::constants::{
    CROWDED_HUB_COUNT, CROWDED_RADIUS_SHRINK, FALLBACK_RADIUS, MAP_CENTER, MAX_COORD,
    MIN_COORD, MIN_WEIGHT_DISTANCE, ODD_INDEX_RADIUS_BUMP, VERTICAL_STRETCH,
};
use crate::database::Hub;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ProjectionError {
    #[error("Invalid coordinate: lat={lat}, lng={lng}")]
    InvalidCoordinate { lat: f64, lng: f64 },
}

/// Latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    #[serde(alias = "lon", alias = "longitude")]
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// Reference city with a hand-measured position on the illustration
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationPoint {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
    #[serde(rename = "svgX")]
    pub svg_x: f64,
    #[serde(rename = "svgY")]
    pub svg_y: f64,
}

impl CalibrationPoint {
    pub fn geo(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }

    /// Difference between the measured position and the naive projection.
    pub fn offset(&self) -> (f64, f64) {
        let (naive_x, naive_y) = naive_projection(self.lat, self.lng);
        (self.svg_x - naive_x, self.svg_y - naive_y)
    }
}

// svg_x / svg_y are percentages of the viewport
pub static CALIBRATION_POINTS: [CalibrationPoint; 6] = [
    CalibrationPoint { name: "London", lat: 51.5074, lng: -0.1278, svg_x: 49.8, svg_y: 25.0 },
    CalibrationPoint { name: "New York", lat: 40.7128, lng: -74.0060, svg_x: 27.5, svg_y: 31.0 },
    CalibrationPoint { name: "São Paulo", lat: -23.5505, lng: -46.6333, svg_x: 34.5, svg_y: 66.0 },
    CalibrationPoint { name: "Cape Town", lat: -33.9249, lng: 18.4241, svg_x: 53.0, svg_y: 72.0 },
    CalibrationPoint { name: "Tokyo", lat: 35.6762, lng: 139.6503, svg_x: 86.5, svg_y: 33.5 },
    CalibrationPoint { name: "Sydney", lat: -33.8688, lng: 151.2093, svg_x: 89.0, svg_y: 74.0 },
];

/// Final marker placement, both axes in `[MIN_COORD, MAX_COORD]` percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPosition {
    pub x: f64,
    pub y: f64,
}

impl ProjectedPosition {
    fn clamped(x: f64, y: f64) -> Self {
        Self {
            x: x.clamp(MIN_COORD, MAX_COORD),
            y: y.clamp(MIN_COORD, MAX_COORD),
        }
    }

    pub fn distance_to(&self, other: &ProjectedPosition) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Projected,
    Fallback,
}

/// A hub id with where its marker goes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedHub {
    pub id: String,
    #[serde(flatten)]
    pub position: ProjectedPosition,
    pub placement: Placement,
}

/// Planar distance in raw degree space. Good enough for picking neighbours.
pub fn distance(a: GeoPoint, b: GeoPoint) -> f64 {
    ((a.lat - b.lat).powi(2) + (a.lng - b.lng).powi(2)).sqrt()
}

/// Equirectangular projection onto a 0-100 square
pub fn naive_projection(lat: f64, lng: f64) -> (f64, f64) {
    ((lng + 180.0) / 360.0 * 100.0, (90.0 - lat) / 180.0 * 100.0)
}

/// The two calibration points closest to `target`, nearest first.
///
/// Equal distances keep table order (stable sort).
pub fn nearest_calibration_points(
    target: GeoPoint,
) -> [(&'static CalibrationPoint, f64); 2] {
    let mut ranked: Vec<(&'static CalibrationPoint, f64)> = CALIBRATION_POINTS
        .iter()
        .map(|point| (point, distance(target, point.geo())))
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    [ranked[0], ranked[1]]
}

/// Project a coordinate onto the illustration.
pub fn project(lat: f64, lng: f64) -> Result<ProjectedPosition, ProjectionError> {
    let target = GeoPoint::new(lat, lng);
    if !target.is_finite() {
        return Err(ProjectionError::InvalidCoordinate { lat, lng });
    }

    let [(p1, d1), (p2, d2)] = nearest_calibration_points(target);

    let w1 = 1.0 / d1.max(MIN_WEIGHT_DISTANCE);
    let w2 = 1.0 / d2.max(MIN_WEIGHT_DISTANCE);
    let weight1 = w1 / (w1 + w2);
    let weight2 = w2 / (w1 + w2);

    let (off1_x, off1_y) = p1.offset();
    let (off2_x, off2_y) = p2.offset();
    let offset_x = off1_x * weight1 + off2_x * weight2;
    let offset_y = off1_y * weight1 + off2_y * weight2;

    let (naive_x, naive_y) = naive_projection(lat, lng);
    let x = naive_x + offset_x;
    let y = naive_y + offset_y;

    let stretched_y = MAP_CENTER + (y - MAP_CENTER) * VERTICAL_STRETCH;

    Ok(ProjectedPosition::clamped(x, stretched_y))
}

/// Ring layout for hubs that have no usable coordinates.
pub fn fallback_position(index: usize, total: usize) -> ProjectedPosition {
    let total = total.max(1);
    let shrink = if total > CROWDED_HUB_COUNT { CROWDED_RADIUS_SHRINK } else { 0.0 };
    let radius = FALLBACK_RADIUS - shrink + (index % 2) as f64 * ODD_INDEX_RADIUS_BUMP;
    let angle = TAU * index as f64 / total as f64;

    ProjectedPosition::clamped(
        MAP_CENTER + radius * angle.cos(),
        MAP_CENTER + radius * angle.sin(),
    )
}

pub fn place_hub(hub: &Hub, index: usize, total: usize) -> PlacedHub {
    let projected = hub.coordinates.map(|c| project(c.lat, c.lng));

    let (position, placement) = match projected {
        Some(Ok(position)) => (position, Placement::Projected),
        Some(Err(e)) => {
            warn!(hub = %hub.id, error = %e, "falling back to ring layout");
            (fallback_position(index, total), Placement::Fallback)
        }
        None => (fallback_position(index, total), Placement::Fallback),
    };

    PlacedHub {
        id: hub.id.clone(),
        position,
        placement,
    }
}

/// Place every hub, preserving input order.
pub fn layout(hubs: &[Hub]) -> Vec<PlacedHub> {
    let total = hubs.len();
    hubs
        .iter()
        .enumerate()
        .map(|(index, hub)| place_hub(hub, index, total))
        .collect()
}
