use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    /// Remote CSV URL or a local file path.
    pub source: String,
    #[serde(default)]
    pub columns: ColumnConfig,
    /// Upper bound on one remote fetch, connect to last body byte.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Header names in the feed, one per record field.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ColumnConfig {
    pub latitude: String,
    pub longitude: String,
    pub distress_type: String,
    pub distress_level: String,
    pub severity: String,
    pub media_reference: String,
    pub observed_at: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            latitude: "latitude_y".to_string(),
            longitude: "longitude_".to_string(),
            distress_type: "Distress_Type".to_string(),
            distress_level: "Distress_Level".to_string(),
            severity: "Severity".to_string(),
            media_reference: "File_URL".to_string(),
            observed_at: "DateTime_1".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MapConfig {
    pub title: String,
    pub attribution: String,
    pub zoom_start: u8,
    /// [lat, lon] used when there are no records to average.
    pub fallback_center: [f64; 2],
    pub width: u32,
    pub height: u32,
    pub popup_width: u32,
    pub popup_height: u32,
    pub media_width: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            title: "Distress Points Map".to_string(),
            attribution: "© Bipul Dey, Department of Urban & Regional Planning, RUET, 2024."
                .to_string(),
            zoom_start: 10,
            fallback_center: [24.3636, 88.6280],
            width: 1400,
            height: 700,
            popup_width: 300,
            popup_height: 300,
            media_width: 200,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Where the record feed comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedSource {
    Remote(String),
    File(PathBuf),
}

impl InputConfig {
    pub fn feed_source(&self) -> FeedSource {
        let source = self.source.trim();
        if source.starts_with("http://") || source.starts_with("https://") {
            FeedSource::Remote(source.to_string())
        } else {
            FeedSource::File(PathBuf::from(source))
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}
