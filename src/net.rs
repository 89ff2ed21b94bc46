use crate::client::HttpClientFactory;
use crate::errors::SyncError;
use http::HeaderMap;
use url::Url;

#[derive(Debug)]
pub struct Response {
    pub url: Url,
    pub status: u16,
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

// Loads an URL through the shared replication client and returns the response
pub async fn fetch(factory: &HttpClientFactory, url: &str) -> Result<Response, SyncError> {
    let res = factory
        .client()
        .get(url)
        .send()
        .await
        .map_err(|e| SyncError::Network(e.to_string()))?;

    // Fetch results
    let final_url = res.url().clone();
    let status = res.status().as_u16();
    let status_text = res
        .status()
        .canonical_reason()
        .unwrap_or("Unknown")
        .to_string();
    let headers = res.headers().clone();

    // Fetch body. We don't do streaming yet
    let body = res
        .bytes()
        .await
        .map_err(|e| SyncError::Network(e.to_string()))?
        .to_vec();

    Ok(Response {
        url: final_url,
        status,
        status_text,
        headers,
        body,
    })
}
