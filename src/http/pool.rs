use reqwest::Client;
use std::time::Duration;
use crate::error::Result;

const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Debug, Clone, Copy)]
pub struct HttpSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

pub fn create_http_client(settings: &HttpSettings) -> Result<Client> {
    let client = Client::builder()
        .tcp_nodelay(true)
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .pool_max_idle_per_host(10)
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .build()?;

    Ok(client)
}
