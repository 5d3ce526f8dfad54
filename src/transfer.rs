use std::fs::File;
use std::io::Write;
use std::path::Path;

use humansize::{format_size, BINARY};
use log::{debug, info, warn};

use crate::core::GenericResult;
use crate::http_client::{
    Body, HeaderName, HeaderValue, HttpClient, HttpRequest, Method, StreamReplyReader,
    TextReplyReader, Url, parse_url};

pub const DEFAULT_ARCHIVE_NAME: &str = "docker-volumes.tar";

const MAX_DAYS_HEADER: &str = "max-days";

/// Client of a transfer.sh-compatible file sharing service.
pub struct Transfer {
    client: HttpClient,
}

impl Transfer {
    pub fn new(client: HttpClient) -> Transfer {
        Transfer {client}
    }

    /// Uploads the file via `PUT <endpoint>/<name>` and returns the download URL from the response.
    pub fn upload(&self, path: &Path, endpoint: &Url, name: &str, max_days: Option<u32>) -> GenericResult<String> {
        let url = get_upload_url(endpoint, name)?;

        let file = File::open(path).map_err(|e| format!("Unable to open {:?}: {}", path, e))?;
        let size = file.metadata()?.len();

        info!("Uploading the archive ({}) to {}...", format_size(size, BINARY), url);

        let mut request = HttpRequest::new(Method::PUT, url, TextReplyReader::new())
            .with_body(&mime::APPLICATION_OCTET_STREAM, Body::sized(file, size))?;

        if let Some(max_days) = max_days {
            request = request.with_header(HeaderName::from_static(MAX_DAYS_HEADER), HeaderValue::from(max_days));
        }

        let reply = self.client.send(request).map_err(|e| format!("Upload failed: {}", e))?;

        let mut lines = reply.lines().map(str::trim).filter(|line| !line.is_empty());

        let download_url = lines.next().ok_or("Upload failed: server returned an empty response")?;
        for line in lines {
            debug!("Server reply: {}", line);
        }

        if let Err(err) = parse_url(download_url) {
            warn!("Server returned an unexpected response: {}.", err);
        }

        info!("Upload completed.");
        Ok(download_url.to_owned())
    }

    pub fn download<W: Write>(&self, url: &Url, writer: W) -> GenericResult<u64> {
        info!("Downloading {}...", url);

        let request = HttpRequest::new(Method::GET, url.clone(), StreamReplyReader::new(writer));
        let size = self.client.send(request).map_err(|e| format!("Download failed: {}", e))?;

        info!("Downloaded {}.", format_size(size, BINARY));
        Ok(size)
    }
}

fn get_upload_url(endpoint: &Url, name: &str) -> GenericResult<Url> {
    let mut url = endpoint.clone();
    url.set_path(endpoint.path().trim_end_matches('/'));

    url.path_segments_mut()
        .map_err(|_| format!("Invalid endpoint URL: {}", endpoint))?
        .pop_if_empty()
        .push(name);

    Ok(url)
}

pub fn parse_archive_name(name: &str) -> GenericResult<String> {
    if name.is_empty() || name.contains('/') || name == "." || name == ".." {
        return Err!("Invalid archive name: {:?}", name);
    }
    Ok(name.to_owned())
}
