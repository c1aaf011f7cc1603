use crate::config::MapConfig;
use crate::types::{DistressRecord, PopupBlock, PopupContent};

/// Popup content for one record: type, level, severity, the embedded media
/// frame, then the observation time.
pub fn format_popup(record: &DistressRecord, map: &MapConfig) -> PopupContent {
    PopupContent {
        blocks: vec![
            field("Distress Type", &record.distress_type),
            field("Distress Level", &record.distress_level),
            field("Severity", &record.severity),
            PopupBlock::Media {
                src: record.media_reference.clone(),
                width: map.media_width,
            },
            field("Date and Time", &record.observed_at),
        ],
        width: map.popup_width,
        height: map.popup_height,
    }
}

fn field(label: &str, value: &str) -> PopupBlock {
    PopupBlock::Field {
        label: label.to_string(),
        value: value.to_string(),
    }
}
