// Test helpers are intentionally partially used
#![allow(dead_code)]

use axum_observability::create_router;
use reqwest::Client;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::sleep;

pub struct TestServer {
    pub addr: std::net::SocketAddr,
    pub client: Client,
}

impl TestServer {
    // ---
    /// Binds an ephemeral port and serves a fresh router (and therefore a
    /// fresh metric registry) in the background. Per-test registries mean
    /// scrape assertions can be exact without cross-test serialization.
    pub async fn new() -> Self {
        // ---
        let app = create_router().expect("Should be able to create router");
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Spawn the server in the background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start
        sleep(Duration::from_millis(100)).await;

        let client = Client::new();

        Self { addr, client }
    }

    pub fn url(&self, path: &str) -> String {
        // ---
        format!("http://{}{}", self.addr, path)
    }

    /// Fetches the exposition body from /metrics.
    pub async fn scrape(&self) -> String {
        // ---
        let res = self.client.get(self.url("/metrics")).send().await.unwrap();
        assert!(res.status().is_success(), "scrape should succeed");
        res.text().await.unwrap()
    }
}

/// Extracts the value of the first sample line for `name` whose label block
/// contains every `labels` pair. Comment lines are ignored.
pub fn sample_value(body: &str, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
    // ---
    body.lines()
        .filter(|line| !line.starts_with('#'))
        .find_map(|line| {
            let (series, value) = line.rsplit_once(' ')?;
            let (metric, label_block) = match series.split_once('{') {
                Some((metric, rest)) => (metric, rest.trim_end_matches('}')),
                None => (series, ""),
            };
            if metric != name {
                return None;
            }
            let matches = labels
                .iter()
                .all(|(key, val)| label_block.contains(&format!("{key}=\"{val}\"")));
            if matches {
                value.parse().ok()
            } else {
                None
            }
        })
}
