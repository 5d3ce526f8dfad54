use std::error::Error;
use std::fmt;
use std::io::Read;

use itertools::Itertools;
use log::{log_enabled, trace};
use reqwest::blocking::{Client, ClientBuilder};

use crate::core::GenericResult;

use super::{HttpRequest, HttpResponse, ResponseReader, StatusCode};

const USER_AGENT: &str = concat!("dvm/", env!("CARGO_PKG_VERSION"));
const MAX_ERROR_BODY_SIZE: u64 = 4096;

pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> GenericResult<HttpClient> {
        HttpClient::build(Client::builder())
    }

    #[cfg(test)]
    pub fn new_without_proxy() -> GenericResult<HttpClient> {
        HttpClient::build(Client::builder().no_proxy())
    }

    fn build(builder: ClientBuilder) -> GenericResult<HttpClient> {
        // Archives may be huge, so transfers are never limited in time
        let client = builder
            .user_agent(USER_AGENT)
            .timeout(None)
            .build().map_err(|e| format!("Unable to create HTTP client: {}", e))?;

        Ok(HttpClient {client})
    }

    pub fn send<R: ResponseReader>(&self, request: HttpRequest<R>) -> Result<R::Result, HttpClientError> {
        let HttpRequest {method, url, headers, body, reply_reader} = request;

        if log_enabled!(log::Level::Trace) {
            let mut extra_info = String::new();

            if !headers.is_empty() {
                extra_info += &format!(":\n{}", headers.iter()
                    .map(|(name, value)| format!("{}: {}", name, String::from_utf8_lossy(value.as_bytes())))
                    .join("\n"));
            }

            trace!("Sending {method} {url}{extra_info}...");
        }

        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().map_err(|e| HttpClientError::Generic(format_error(&e)))?;
        let status = response.status();
        trace!("Got {} response.", status);

        if status.is_success() {
            Ok(reply_reader.read(response).map_err(HttpClientError::generic_from)?)
        } else if status.is_client_error() || status.is_server_error() {
            Err(HttpClientError::Api {
                status,
                message: read_plain_text_error(response),
            })
        } else {
            Err(HttpClientError::Generic(format!("Server returned an unexpected response: {}", status)))
        }
    }
}

#[derive(Debug)]
pub enum HttpClientError {
    Generic(String),
    Api {
        status: StatusCode,
        message: Option<String>,
    },
}

impl HttpClientError {
    pub fn generic_from<E: ToString>(error: E) -> HttpClientError {
        HttpClientError::Generic(error.to_string())
    }
}

impl Error for HttpClientError {
}

impl fmt::Display for HttpClientError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HttpClientError::Generic(err) => write!(f, "{}", err),
            HttpClientError::Api {status, message: Some(message)} => write!(
                f, "Server returned an error ({}): {}", status, message),
            HttpClientError::Api {status, message: None} => write!(
                f, "Server returned an error: {}", status),
        }
    }
}

impl From<String> for HttpClientError {
    fn from(err: String) -> HttpClientError {
        HttpClientError::Generic(err)
    }
}

// reqwest hides the actual reason (connection refused, DNS failure, etc.) in the error source
fn format_error(error: &dyn Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();

    while let Some(error) = source {
        let reason = error.to_string();
        if !message.contains(&reason) {
            message = format!("{}: {}", message, reason);
        }
        source = error.source();
    }

    message
}

fn read_plain_text_error(response: HttpResponse) -> Option<String> {
    let mut body = Vec::new();
    response.take(MAX_ERROR_BODY_SIZE).read_to_end(&mut body).ok()?;

    let body = String::from_utf8_lossy(&body);
    let error = body.lines().next().unwrap_or("").trim_end_matches('.').trim();

    if error.is_empty() {
        None
    } else {
        Some(error.to_owned())
    }
}
