use resilient_http::{create_client, ClientSettings};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let url = std::env::var("RESILIENT_HTTP_DEMO_URL")
        .unwrap_or_else(|_| "https://httpbin.org/status/503".to_owned());

    // RESILIENT_HTTP_* variables override the defaults.
    let config = ClientSettings::from_env()?.into_config();
    let client = create_client(config)?;

    match client.get(&url).send().await {
        Ok(response) => println!("{} -> {}", url, response.status()),
        Err(err) => println!("{url} failed after {:?} attempt(s): {err}", err.attempts()),
    }

    Ok(())
}
