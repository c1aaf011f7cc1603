use crate::config::MapConfig;
use crate::popup::format_popup;
use crate::processing::{map_center, severity_options};
use crate::severity::classify;
use crate::types::{
    DistressRecord, LatLon, LayerMode, LayerSelection, MapView, Marker, MarkerCluster, Overlay,
};
use tracing::{debug, info};

impl Marker {
    pub fn from_record(record: &DistressRecord, map: &MapConfig) -> Self {
        Marker {
            position: record.position,
            color: classify(&record.severity),
            popup: format_popup(record, map),
        }
    }
}

/// Builds the overlay for the selected layer. Never fails: an empty record
/// set, a missing severity filter, or a filter that matches nothing all
/// produce an empty overlay of the mode's shape.
pub fn render_layer(
    records: &[DistressRecord],
    selection: &LayerSelection,
    map: &MapConfig,
) -> Overlay {
    match selection.mode {
        LayerMode::AllDistresses => Overlay::Markers {
            markers: markers(records.iter(), map),
        },
        LayerMode::BySeverity => {
            let matched = match selection.severity.as_deref() {
                Some(wanted) => markers(records.iter().filter(|r| r.severity == wanted), map),
                None => {
                    debug!("By Severity selected without a severity value");
                    Vec::new()
                }
            };
            Overlay::Markers { markers: matched }
        }
        LayerMode::DistressHeatmap => Overlay::Heatmap {
            points: records.iter().map(|r| r.position).collect(),
        },
        LayerMode::DistressTypeClustering => Overlay::Cluster {
            cluster: MarkerCluster {
                markers: markers(records.iter(), map),
            },
        },
    }
}

fn markers<'a>(records: impl Iterator<Item = &'a DistressRecord>, map: &MapConfig) -> Vec<Marker> {
    records.map(|r| Marker::from_record(r, map)).collect()
}

/// One complete render pass over an already loaded record set.
pub fn render_pass(
    records: &[DistressRecord],
    selection: LayerSelection,
    map: &MapConfig,
    skipped: usize,
) -> MapView {
    let [lat, lon] = map.fallback_center;
    let center = map_center(records, LatLon::new(lat, lon));
    let options = severity_options(records);
    let overlay = render_layer(records, &selection, map);

    if overlay.is_empty() {
        info!("Rendered '{}' layer: nothing to show", selection.mode);
    } else {
        info!(
            "Rendered '{}' layer: {} of {} records",
            selection.mode,
            overlay.len(),
            records.len()
        );
    }

    MapView {
        center,
        zoom: map.zoom_start,
        selection,
        severity_options: options,
        overlay,
        skipped,
    }
}
