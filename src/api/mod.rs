//! Outbound image services.

pub mod picsum;
pub mod pollinations;

use crate::retry::FetchError;
use reqwest::Client;
use std::time::Duration;

/// Target frame of every requested image.
pub const IMAGE_WIDTH: u32 = 1080;
pub const IMAGE_HEIGHT: u32 = 1920;

/// One GET against an image service. Only a 200 with a non-empty body counts.
pub async fn fetch_image_bytes(
    client: &Client,
    url: &str,
    timeout: Duration,
) -> Result<Vec<u8>, FetchError> {
    let resp = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(FetchError::from_reqwest)?;

    let status = resp.status();
    if status.as_u16() != 200 {
        return Err(FetchError::Status(status.as_u16()));
    }

    let bytes = resp.bytes().await.map_err(FetchError::from_reqwest)?;
    if bytes.is_empty() {
        return Err(FetchError::EmptyBody);
    }
    Ok(bytes.to_vec())
}

pub(crate) fn url_encode_component(input: &str) -> String {
    let mut out = String::new();
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' || ch == '~' {
            out.push(ch);
        } else if ch == ' ' {
            out.push_str("%20");
        } else {
            let mut buf = [0u8; 4];
            let bytes = ch.encode_utf8(&mut buf).as_bytes();
            for b in bytes {
                out.push('%');
                out.push_str(&format!("{:02X}", b));
            }
        }
    }
    out
}

pub(crate) fn trim_host(host: &str) -> &str {
    host.trim_end_matches('/')
}
