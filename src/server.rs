use crate::config::AppConfig;
use crate::data::{self, LoadError};
use crate::html;
use crate::render;
use crate::types::{LayerMode, LayerSelection};
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub struct AppState {
    pub config: AppConfig,
    pub http: reqwest::Client,
    /// Held for the whole of a render pass so passes never overlap.
    pub pass_lock: Mutex<()>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, LoadError> {
        Ok(Self {
            http: data::feed_client(&config.input)?,
            config,
            pass_lock: Mutex::new(()),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OverlayParams {
    layer: Option<String>,
    severity: Option<String>,
}

impl OverlayParams {
    /// Absent layer means the selector's default; an unknown one is rejected.
    fn selection(&self) -> Result<LayerSelection, crate::types::UnknownLayerMode> {
        let mode = match self.layer.as_deref() {
            Some(label) => label.parse()?,
            None => LayerMode::default(),
        };
        Ok(LayerSelection {
            mode,
            severity: self.severity.clone(),
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/overlay", get(overlay_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig) -> Result<()> {
    let port = config.server.port;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let app = router(Arc::new(AppState::new(config)?));

    info!("Serving distress map on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(html::render_index(&state.config.map))
}

async fn overlay_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OverlayParams>,
) -> Response {
    let selection = match params.selection() {
        Ok(selection) => selection,
        Err(e) => {
            warn!("{}", e);
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    let _pass = state.pass_lock.lock().await;

    let loaded = match data::load_records(&state.config, &state.http).await {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("Render pass aborted: {}", e);
            return error_response(load_error_status(&e), e.to_string());
        }
    };

    let view = render::render_pass(&loaded.records, selection, &state.config.map, loaded.skipped);
    Json(view).into_response()
}

fn load_error_status(e: &LoadError) -> StatusCode {
    match e {
        LoadError::Read { .. } | LoadError::Client(_) => StatusCode::INTERNAL_SERVER_ERROR,
        LoadError::Fetch { .. } | LoadError::Csv(_) | LoadError::MissingColumn(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FEED: &str = "latitude_y,longitude_,Distress_Type,Distress_Level,Severity,File_URL,DateTime_1\n\
                        24.36,88.60,Pothole,3,High,u1,t1\n\
                        24.37,88.61,Raveling,2,Medium,u2,t2\n\
                        24.38,88.62,Crack,1,Low,u3,t3\n";

    fn state_for(source: &str) -> Arc<AppState> {
        let config = AppConfig::from_toml(&format!("[input]\nsource = {:?}\n", source)).unwrap();
        Arc::new(AppState::new(config).unwrap())
    }

    fn feed_file(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn params(layer: Option<&str>, severity: Option<&str>) -> OverlayParams {
        OverlayParams {
            layer: layer.map(str::to_string),
            severity: severity.map(str::to_string),
        }
    }

    #[test]
    fn test_params_default_to_all_distresses() {
        let selection = OverlayParams::default().selection().unwrap();
        assert_eq!(selection, LayerSelection::new(LayerMode::AllDistresses));
    }

    #[test]
    fn test_params_keep_severity_value() {
        let selection = params(Some("By Severity"), Some("Medium")).selection().unwrap();
        assert_eq!(selection, LayerSelection::by_severity("Medium"));
    }

    #[test]
    fn test_params_reject_unknown_layer() {
        assert!(params(Some("Satellite"), None).selection().is_err());
    }

    #[tokio::test]
    async fn test_overlay_handler_renders_selected_layer() {
        let file = feed_file(FEED);
        let state = state_for(file.path().to_str().unwrap());

        let response = overlay_handler(
            State(state),
            Query(params(Some("Distress Type Clustering"), None)),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let view = body_json(response).await;
        assert_eq!(view["selection"]["mode"], "Distress Type Clustering");
        assert_eq!(view["overlay"]["kind"], "cluster");
        assert_eq!(view["overlay"]["cluster"]["markers"].as_array().unwrap().len(), 3);
        assert_eq!(view["severity_options"], json!(["High", "Medium", "Low"]));
    }

    #[tokio::test]
    async fn test_overlay_handler_filters_by_severity() {
        let file = feed_file(FEED);
        let state = state_for(file.path().to_str().unwrap());

        let response = overlay_handler(State(state), Query(params(Some("By Severity"), Some("High")))).await;

        let view = body_json(response).await;
        let markers = view["overlay"]["markers"].as_array().unwrap();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0]["color"], "red");
    }

    #[tokio::test]
    async fn test_overlay_handler_filters_on_blank_severity() {
        let file = feed_file(&format!("{}24.39,88.63,Patch,1,,u4,t4\n", FEED));
        let state = state_for(file.path().to_str().unwrap());

        let response = overlay_handler(State(state), Query(params(Some("By Severity"), Some("")))).await;

        let view = body_json(response).await;
        assert_eq!(view["selection"]["severity"], "");
        assert_eq!(view["severity_options"], json!(["High", "Medium", "Low", ""]));
        let markers = view["overlay"]["markers"].as_array().unwrap();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0]["position"], json!([24.39, 88.63]));
        assert_eq!(markers[0]["color"], "green");
    }

    #[tokio::test]
    async fn test_silent_feed_ends_pass_with_bad_gateway() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let mut config =
            AppConfig::from_toml(&format!("[input]\nsource = \"http://{}/feed.csv\"\n", addr)).unwrap();
        config.input.timeout_secs = 1;
        let state = Arc::new(AppState::new(config).unwrap());

        // A second pass must not stay queued behind the first.
        for _ in 0..2 {
            let response = tokio::time::timeout(
                std::time::Duration::from_secs(10),
                overlay_handler(State(state.clone()), Query(OverlayParams::default())),
            )
            .await
            .expect("render pass never finished");
            assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        }
        server.abort();
    }

    #[tokio::test]
    async fn test_overlay_handler_rejects_unknown_layer() {
        let file = feed_file(FEED);
        let state = state_for(file.path().to_str().unwrap());

        let response = overlay_handler(State(state), Query(params(Some("Everything"), None))).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_overlay_handler_surfaces_broken_feed() {
        let file = feed_file("lat,lon\n1,2\n");
        let state = state_for(file.path().to_str().unwrap());

        let response = overlay_handler(State(state), Query(OverlayParams::default())).await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("latitude_y"));
    }

    #[tokio::test]
    async fn test_overlay_handler_surfaces_missing_feed_file() {
        let state = state_for("/nonexistent/distress.csv");

        let response = overlay_handler(State(state), Query(OverlayParams::default())).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_empty_feed_renders_empty_map() {
        let file = feed_file("latitude_y,longitude_,Distress_Type,Distress_Level,Severity,File_URL,DateTime_1\n");
        let state = state_for(file.path().to_str().unwrap());

        let response = overlay_handler(State(state), Query(params(Some("Distress Heatmap"), None))).await;

        assert_eq!(response.status(), StatusCode::OK);
        let view = body_json(response).await;
        assert_eq!(view["overlay"], json!({ "kind": "heatmap", "points": [] }));
        assert_eq!(view["center"], json!([24.3636, 88.628]));
    }

    #[tokio::test]
    async fn test_index_page_uses_configured_title() {
        let state = state_for("unused.csv");
        let Html(page) = index_handler(State(state)).await;
        assert!(page.contains("<h1>Distress Points Map</h1>"));
    }
}
