mod client;
mod readers;
mod request;

pub use reqwest::{Method, StatusCode, Url};
pub use reqwest::blocking::{Body, Response as HttpResponse};
pub use reqwest::header::{HeaderName, HeaderValue};

pub use self::client::HttpClient;
pub use self::readers::{ResponseReader, TextReplyReader, StreamReplyReader};
pub use self::request::HttpRequest;

use crate::core::GenericResult;

pub fn parse_url(url: &str) -> GenericResult<Url> {
    let parsed = Url::parse(url).map_err(|e| format!("Invalid URL {:?}: {}", url, e))?;

    if !matches!(parsed.scheme(), "http" | "https") || !parsed.has_host() {
        return Err!("Invalid URL {:?}: only http:// and https:// URLs are supported", url);
    }

    Ok(parsed)
}
