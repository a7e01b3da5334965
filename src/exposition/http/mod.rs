use crate::exposition::prometheus;
use crate::metrics::Registry;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use metriken::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, decompression::RequestDecompressionLayer};
use tracing::{error, info};

const INDEX: &str = r#"<html>
<head><title>PPU Exporter</title></head>
<body>
<h1>PPU Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
</body>
</html>"#;

struct AppState {
    registry: Arc<Registry>,
}

pub async fn serve(listen: SocketAddr, registry: Arc<Registry>) -> std::io::Result<()> {
    let state = Arc::new(AppState { registry });

    let app: Router = app(state);

    let listener = TcpListener::bind(listen).await?;

    info!("serving metrics on http://{listen}/metrics");

    axum::serve(listener, app).await
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/metrics", get(metrics))
        .route("/metrics/binary", get(msgpack))
        .route("/metrics/json", get(json))
        .route("/vars", get(vars))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(RequestDecompressionLayer::new())
                .layer(CompressionLayer::new()),
        )
}

async fn root() -> Html<&'static str> {
    Html(INDEX)
}

async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.registry.snapshot();

    match prometheus::encode(&snapshot) {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!("failed to encode metrics: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn msgpack(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.registry.snapshot();

    match rmp_serde::encode::to_vec_named(&snapshot) {
        Ok(body) => body.into_response(),
        Err(e) => {
            error!("failed to serialize snapshot: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn json(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.registry.snapshot();

    match serde_json::to_string(&snapshot) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            error!("failed to serialize snapshot: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Human readable self-telemetry of the exporter itself.
async fn vars() -> String {
    let mut data = Vec::new();

    for metric in metriken::metrics().iter() {
        match metric.value() {
            Some(Value::Counter(value)) => data.push(format!("{}: {value}", metric.name())),
            Some(Value::Gauge(value)) => data.push(format!("{}: {value}", metric.name())),
            _ => {}
        }
    }

    data.sort();
    let mut content = data.join("\n");
    content += "\n";
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::catalog::*;
    use crate::samplers::{Generator, NodeIdentity};

    use axum::body::Body;
    use axum::http::Request;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tower::ServiceExt;

    fn state(devices: usize) -> Arc<AppState> {
        let registry = Arc::new(Registry::with_catalog().unwrap());

        let node = NodeIdentity {
            name: "node-a".to_string(),
            pool_id: "np-1".to_string(),
            pod_source: "ecs".to_string(),
            driver_version: "1.5.1-1d747a".to_string(),
        };
        Generator::new(node, devices, StdRng::seed_from_u64(0)).generate_cycle(&registry);

        Arc::new(AppState { registry })
    }

    async fn get(state: Arc<AppState>, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, body.to_vec())
    }

    #[tokio::test]
    async fn index_links_metrics() {
        let (status, body) = get(state(0), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains(r#"<a href="/metrics">"#));
    }

    #[tokio::test]
    async fn metrics_text() {
        let (status, body) = get(state(16), "/metrics").await;
        assert_eq!(status, StatusCode::OK);

        let text = String::from_utf8(body).unwrap();
        let lines = text.lines().map(|l| Ok(l.to_string()));
        let scrape = prometheus_parse::Scrape::parse(lines).unwrap();

        let used: Vec<_> = scrape
            .samples
            .iter()
            .filter(|s| s.metric == DEV_FB_USED)
            .collect();
        assert_eq!(used.len(), 16);

        for sample in used {
            assert_eq!(sample.labels.get("NodeName"), Some("node-a"));
            assert_eq!(sample.labels.get("NodePoolId"), Some("np-1"));
        }

        let illegal = scrape
            .samples
            .iter()
            .filter(|s| s.metric == CUSTOM_ILLEGAL_PROCESS_MEM_USED)
            .count();
        assert_eq!(illegal, 2);
    }

    #[tokio::test]
    async fn metrics_without_devices() {
        let (status, body) = get(state(0), "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn json_snapshot() {
        let (status, body) = get(state(2), "/metrics/json").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["commits"], 1);

        let families = json["families"].as_array().unwrap();
        let count = families
            .iter()
            .find(|f| f["name"] == DEV_COUNT)
            .unwrap();
        assert_eq!(count["kind"], "gauge");
        assert_eq!(count["series"][0]["value"], 2.0);
    }

    #[tokio::test]
    async fn binary_snapshot() {
        let (status, body) = get(state(1), "/metrics/binary").await;

        assert_eq!(status, StatusCode::OK);
        assert!(!body.is_empty());

        let value: serde_json::Value = rmp_serde::from_slice(&body).unwrap();
        assert!(value["families"].is_array());
    }

    #[tokio::test]
    async fn vars_reports_sampler_activity() {
        let config = Arc::new(crate::config::Config::default());
        let registry = Arc::new(Registry::with_catalog().unwrap());

        let samplers = crate::samplers::init(config, registry.clone());
        assert!(!samplers.is_empty());
        crate::samplers::refresh(&samplers).await;

        let (status, body) = get(Arc::new(AppState { registry }), "/vars").await;
        assert_eq!(status, StatusCode::OK);

        let text = String::from_utf8(body).unwrap();
        let value = |name: &str| -> i64 {
            let prefix = format!("{name}: ");
            text.lines()
                .find_map(|line| line.strip_prefix(prefix.as_str()))
                .unwrap_or_else(|| panic!("{name} missing from /vars:\n{text}"))
                .parse()
                .unwrap()
        };

        assert!(value("exporter_generation_cycles") >= 1);
        assert!(value("exporter_samples_written") >= 1);
        assert!(value("exporter_series") >= 1);
    }

    #[tokio::test]
    async fn unknown_route() {
        let (status, _) = get(state(0), "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
