use mime::Mime;
use reqwest::header::{self, HeaderMap};

use crate::core::GenericResult;

use super::{Body, HeaderName, HeaderValue, Method, ResponseReader, Url};

pub struct HttpRequest<R> {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Body>,
    pub reply_reader: R,
}

impl<R: ResponseReader> HttpRequest<R> {
    pub fn new(method: Method, url: Url, reply_reader: R) -> HttpRequest<R> {
        HttpRequest {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            reply_reader,
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> HttpRequest<R> {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body<B: Into<Body>>(mut self, content_type: &Mime, body: B) -> GenericResult<HttpRequest<R>> {
        if self.body.is_some() {
            return Err!("An attempt to set request body twice")
        }

        self.headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(content_type.as_ref())?);
        self.body = Some(body.into());

        Ok(self)
    }
}
