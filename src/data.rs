use crate::config::{AppConfig, ColumnConfig, FeedSource, InputConfig};
use crate::types::{DistressRecord, LatLon};
use csv::{ReaderBuilder, StringRecord};
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Failed to fetch distress feed from {url}: {source}")]
    Fetch { url: String, source: reqwest::Error },

    #[error("Failed to read distress feed {path:?}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("Failed to read CSV header: {0}")]
    Csv(#[from] csv::Error),

    #[error("Column '{0}' not found in feed header")]
    MissingColumn(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedRecords {
    pub records: Vec<DistressRecord>,
    /// Rows dropped because they could not be turned into a record.
    pub skipped: usize,
}

/// HTTP client for the feed, bounded by `timeout_secs` so a silent server
/// ends the pass with a fetch error.
pub fn feed_client(input: &InputConfig) -> Result<reqwest::Client, LoadError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(input.timeout_secs))
        .build()
        .map_err(LoadError::Client)
}

pub async fn load_records(
    config: &AppConfig,
    client: &reqwest::Client,
) -> Result<LoadedRecords, LoadError> {
    let body = fetch_feed(&config.input.feed_source(), client).await?;
    let loaded = parse_records(body.as_bytes(), &config.input.columns)?;

    info!(
        "Loaded {} distress records ({} rows skipped)",
        loaded.records.len(),
        loaded.skipped
    );
    Ok(loaded)
}

async fn fetch_feed(source: &FeedSource, client: &reqwest::Client) -> Result<String, LoadError> {
    match source {
        FeedSource::Remote(url) => {
            info!("Fetching distress feed from {}", url);
            let fetch_error = |source| LoadError::Fetch {
                url: url.clone(),
                source,
            };
            let response = client
                .get(url)
                .send()
                .await
                .map_err(fetch_error)?
                .error_for_status()
                .map_err(fetch_error)?;
            response.text().await.map_err(fetch_error)
        }
        FeedSource::File(path) => {
            info!("Reading distress feed from {:?}", path);
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| LoadError::Read {
                    path: path.clone(),
                    source,
                })
        }
    }
}

/// Header positions of the configured columns.
struct ColumnIndex {
    latitude: usize,
    longitude: usize,
    distress_type: usize,
    distress_level: usize,
    severity: usize,
    media_reference: usize,
    observed_at: usize,
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord, columns: &ColumnConfig) -> Result<Self, LoadError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
                .ok_or_else(|| LoadError::MissingColumn(name.to_string()))
        };

        Ok(Self {
            latitude: find(&columns.latitude)?,
            longitude: find(&columns.longitude)?,
            distress_type: find(&columns.distress_type)?,
            distress_level: find(&columns.distress_level)?,
            severity: find(&columns.severity)?,
            media_reference: find(&columns.media_reference)?,
            observed_at: find(&columns.observed_at)?,
        })
    }
}

/// Parses a CSV feed. Rows that cannot become a record are logged and
/// counted, never fatal; a missing column is.
pub fn parse_records<R: Read>(reader: R, columns: &ColumnConfig) -> Result<LoadedRecords, LoadError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let index = ColumnIndex::resolve(&headers, columns)?;

    let mut loaded = LoadedRecords::default();

    for (i, result) in rdr.records().enumerate() {
        let row_number = i + 1;
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                warn!("Skipping feed row {}: {}", row_number, e);
                loaded.skipped += 1;
                continue;
            }
        };

        match parse_row(&row, &index) {
            Ok(record) => loaded.records.push(record),
            Err(reason) => {
                warn!("Skipping feed row {}: {}", row_number, reason);
                loaded.skipped += 1;
            }
        }
    }

    Ok(loaded)
}

fn parse_row(row: &StringRecord, index: &ColumnIndex) -> Result<DistressRecord, String> {
    let lat = coordinate(row, index.latitude, "latitude", 90.0)?;
    let lon = coordinate(row, index.longitude, "longitude", 180.0)?;

    Ok(DistressRecord {
        position: LatLon::new(lat, lon),
        distress_type: text(row, index.distress_type),
        distress_level: text(row, index.distress_level),
        severity: text(row, index.severity),
        media_reference: text(row, index.media_reference),
        observed_at: text(row, index.observed_at),
    })
}

fn coordinate(row: &StringRecord, idx: usize, name: &str, limit: f64) -> Result<f64, String> {
    let raw = row.get(idx).map(str::trim).unwrap_or("");
    if raw.is_empty() {
        return Err(format!("missing {}", name));
    }

    let value: f64 = raw
        .parse()
        .map_err(|_| format!("non-numeric {} '{}'", name, raw))?;
    if !value.is_finite() || value.abs() > limit {
        return Err(format!("{} '{}' out of range", name, raw));
    }
    Ok(value)
}

fn text(row: &StringRecord, idx: usize) -> String {
    row.get(idx).map(str::trim).unwrap_or("").to_string()
}
