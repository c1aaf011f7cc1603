use crate::types::MarkerColor;

/// Marker color for a severity label. Only the exact labels `High` and
/// `Medium` are recognised; everything else is Green.
pub fn classify(severity: &str) -> MarkerColor {
    match severity {
        "High" => MarkerColor::Red,
        "Medium" => MarkerColor::Orange,
        _ => MarkerColor::Green,
    }
}
