use std::time::Duration;
use tokio::sync::OnceCell;

static HTTP_CLIENT: OnceCell<reqwest::Client> = OnceCell::const_new();

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Shared client for narrative requests, built on first use.
pub async fn http_client() -> anyhow::Result<&'static reqwest::Client> {
    HTTP_CLIENT
        .get_or_try_init(|| async {
            reqwest::Client::builder()
                .user_agent(concat!("stock-risk-analyzer/", env!("CARGO_PKG_VERSION")))
                .timeout(REQUEST_TIMEOUT)
                .build()
                .map_err(anyhow::Error::from)
        })
        .await
}
