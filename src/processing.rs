use crate::types::{DistressRecord, LatLon};
use geo::{Centroid, MultiPoint, Point};
use std::collections::HashSet;
use tracing::debug;

/// Initial map center: the mean latitude and mean longitude of all records,
/// or `fallback` when there are none.
pub fn map_center(records: &[DistressRecord], fallback: LatLon) -> LatLon {
    let points: Vec<Point<f64>> = records.iter().map(|r| r.position.into()).collect();

    match MultiPoint::new(points).centroid() {
        Some(centroid) => centroid.into(),
        None => {
            debug!("No records to center on, using fallback {:?}", fallback);
            fallback
        }
    }
}

/// Distinct severity labels in order of first appearance.
pub fn severity_options(records: &[DistressRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut options = Vec::new();
    for record in records {
        if seen.insert(record.severity.as_str()) {
            options.push(record.severity.clone());
        }
    }
    options
}
