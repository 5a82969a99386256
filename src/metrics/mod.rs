use lazy_static::lazy_static;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

lazy_static! {
    pub static ref ACTIVE_STREAMS: IntGauge =
        IntGauge::new("active_streams", "Discovery streams currently open")
            .expect("metric can not be created");

    pub static ref ACTIVE_PROXIES: IntGauge =
        IntGauge::new("active_proxies", "Proxies with a running watchdog")
            .expect("metric can not be created");

    pub static ref WATCHDOG_SYNC_RESULTS: IntCounterVec = IntCounterVec::new(
        Opts::new("watchdog_sync_results", "Watchdog reconciliation outcomes"),
        &["status"]
    )
    .expect("metric can not be created");

    pub static ref INSIGHT_FLUSHES: IntCounterVec = IntCounterVec::new(
        Opts::new("insight_flushes", "Subscription status flush outcomes"),
        &["outcome"]
    )
    .expect("metric can not be created");

    pub static ref XDS_RESPONSES: IntCounterVec = IntCounterVec::new(
        Opts::new("xds_responses", "Discovery responses and replies per resource type"),
        &["type", "outcome"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

pub(crate) fn register_custom_metrics(registry: &Registry) {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(ACTIVE_STREAMS.clone()),
        Box::new(ACTIVE_PROXIES.clone()),
        Box::new(WATCHDOG_SYNC_RESULTS.clone()),
        Box::new(INSIGHT_FLUSHES.clone()),
        Box::new(XDS_RESPONSES.clone()),
    ];
    for collector in collectors {
        if let Err(e) = registry.register(collector) {
            error!("collector can not be registered: {}", e);
        }
    }
}

/// Serves `/metrics` until `shutdown_signal` fires.
pub async fn start_server(
    port: u16,
    mut shutdown_signal: watch::Receiver<()>,
) {
    register_custom_metrics(&REGISTRY);

    let metrics_route = warp::path!("metrics")
        .map(|| REGISTRY.clone())
        .and_then(metrics_handler);

    info!("metrics server listening on port {}", port);
    let (_, server) =
        warp::serve(metrics_route).bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
            let _ = shutdown_signal.changed().await;
        });
    server.await;
}

async fn metrics_handler(registry: Registry) -> Result<impl Reply, Rejection> {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    };
    let res = match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    };
    Ok(res)
}
