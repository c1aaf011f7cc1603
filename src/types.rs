use geo::Point;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Latitude/longitude pair. Serializes as `[lat, lon]`, the order Leaflet expects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "[f64; 2]")]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl From<LatLon> for [f64; 2] {
    fn from(p: LatLon) -> Self {
        [p.lat, p.lon]
    }
}

impl From<LatLon> for Point<f64> {
    fn from(p: LatLon) -> Self {
        Point::new(p.lon, p.lat)
    }
}

impl From<Point<f64>> for LatLon {
    fn from(p: Point<f64>) -> Self {
        LatLon::new(p.y(), p.x())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistressRecord {
    pub position: LatLon,
    pub distress_type: String,
    pub distress_level: String,
    pub severity: String,
    pub media_reference: String,
    pub observed_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerColor {
    Red,
    Orange,
    Green,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum LayerMode {
    #[default]
    #[serde(rename = "All Distresses")]
    AllDistresses,
    #[serde(rename = "By Severity")]
    BySeverity,
    #[serde(rename = "Distress Heatmap")]
    DistressHeatmap,
    #[serde(rename = "Distress Type Clustering")]
    DistressTypeClustering,
}

impl LayerMode {
    /// Selector order; the first entry is the default selection.
    pub const ALL: [LayerMode; 4] = [
        LayerMode::AllDistresses,
        LayerMode::BySeverity,
        LayerMode::DistressHeatmap,
        LayerMode::DistressTypeClustering,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            LayerMode::AllDistresses => "All Distresses",
            LayerMode::BySeverity => "By Severity",
            LayerMode::DistressHeatmap => "Distress Heatmap",
            LayerMode::DistressTypeClustering => "Distress Type Clustering",
        }
    }
}

impl fmt::Display for LayerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown layer mode '{0}' (expected one of: All Distresses, By Severity, Distress Heatmap, Distress Type Clustering)")]
pub struct UnknownLayerMode(pub String);

impl FromStr for LayerMode {
    type Err = UnknownLayerMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LayerMode::ALL
            .into_iter()
            .find(|mode| mode.label() == s)
            .ok_or_else(|| UnknownLayerMode(s.to_string()))
    }
}

/// Layer choice for one render pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct LayerSelection {
    pub mode: LayerMode,
    /// Only consulted for `LayerMode::BySeverity`.
    pub severity: Option<String>,
}

#[cfg(test)]
impl LayerSelection {
    pub fn new(mode: LayerMode) -> Self {
        Self { mode, severity: None }
    }

    pub fn by_severity(severity: impl Into<String>) -> Self {
        Self {
            mode: LayerMode::BySeverity,
            severity: Some(severity.into()),
        }
    }
}

/// One entry of a popup, kept in display order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PopupBlock {
    Field { label: String, value: String },
    Media { src: String, width: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopupContent {
    pub blocks: Vec<PopupBlock>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub position: LatLon,
    pub color: MarkerColor,
    pub popup: PopupContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerCluster {
    pub markers: Vec<Marker>,
}

/// Map-ready output of one render pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Overlay {
    Markers { markers: Vec<Marker> },
    Cluster { cluster: MarkerCluster },
    Heatmap { points: Vec<LatLon> },
}

impl Overlay {
    /// Number of rendered elements (markers or heat points).
    pub fn len(&self) -> usize {
        match self {
            Overlay::Markers { markers } => markers.len(),
            Overlay::Cluster { cluster } => cluster.markers.len(),
            Overlay::Heatmap { points } => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything the map host needs to draw one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub center: LatLon,
    pub zoom: u8,
    pub selection: LayerSelection,
    pub severity_options: Vec<String>,
    pub overlay: Overlay,
    /// Feed rows dropped by the loader for this pass.
    pub skipped: usize,
}
