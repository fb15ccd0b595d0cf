//! Probe behaviour against real sockets.

use std::time::Duration;

use api::probe::{ProbeOutcome, ProbeSettings, probe_once};
use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/health")
}

fn settings(url: String) -> ProbeSettings {
    ProbeSettings {
        url,
        timeout: Duration::from_secs(2),
        ..ProbeSettings::default()
    }
}

#[tokio::test]
async fn error_status_still_counts_as_reachable() {
    let url = serve(Router::new().route(
        "/health",
        get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    ))
    .await;

    let outcome = probe_once(&reqwest::Client::new(), &settings(url)).await;
    assert_eq!(outcome, ProbeOutcome::Reachable { status: 500 });
}

#[tokio::test]
async fn closed_port_is_unreachable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let outcome = probe_once(
        &reqwest::Client::new(),
        &settings(format!("http://{addr}/health")),
    )
    .await;
    assert!(!outcome.is_reachable());
}

#[tokio::test]
async fn slow_server_times_out() {
    let url = serve(Router::new().route(
        "/health",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "late"
        }),
    ))
    .await;

    let mut settings = settings(url);
    settings.timeout = Duration::from_millis(200);
    let outcome = probe_once(&reqwest::Client::new(), &settings).await;
    assert!(matches!(outcome, ProbeOutcome::Unreachable { .. }));
}
