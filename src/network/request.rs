//! HTTP request descriptors
//!
//! A [`RequestDescriptor`] is pure data plus the decoder for its response
//! body. Building one performs no I/O.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::session::AccessToken;
use crate::utils::{NetworkError, Result};

/// HTTP methods used by the engagement API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    /// Whether a request body (and its `Content-Type`) is sent
    pub fn carries_body(&self) -> bool {
        matches!(self, Self::Post | Self::Patch)
    }

    pub(crate) fn as_reqwest(&self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

type DecodeFn<T> = dyn Fn(&[u8]) -> std::result::Result<T, String> + Send + Sync;

/// Turns a successful response body into `T`
pub struct ResponseDecoder<T> {
    decode: Arc<DecodeFn<T>>,
    /// Value produced for a bodyless 2xx DELETE, if the type allows one
    on_empty_delete: Option<Arc<dyn Fn() -> T + Send + Sync>>,
}

impl<T> Clone for ResponseDecoder<T> {
    fn clone(&self) -> Self {
        Self {
            decode: Arc::clone(&self.decode),
            on_empty_delete: self.on_empty_delete.clone(),
        }
    }
}

impl<T: DeserializeOwned + 'static> ResponseDecoder<T> {
    /// Decode the body as JSON
    pub fn json() -> Self {
        Self {
            decode: Arc::new(|body| serde_json::from_slice(body).map_err(|e| e.to_string())),
            on_empty_delete: None,
        }
    }
}

impl ResponseDecoder<Bytes> {
    /// Hand the body back untouched
    pub fn bytes() -> Self {
        Self {
            decode: Arc::new(|body| Ok(Bytes::copy_from_slice(body))),
            on_empty_delete: None,
        }
    }
}

impl ResponseDecoder<bool> {
    /// JSON boolean, or `true` for a DELETE that answers 2xx with no body
    pub fn acknowledgement() -> Self {
        Self {
            decode: Arc::new(|body| serde_json::from_slice(body).map_err(|e| e.to_string())),
            on_empty_delete: Some(Arc::new(|| true)),
        }
    }
}

impl<T> ResponseDecoder<T> {
    /// Build a decoder from an arbitrary function
    pub fn from_fn<F>(decode: F) -> Self
    where
        F: Fn(&[u8]) -> std::result::Result<T, String> + Send + Sync + 'static,
    {
        Self {
            decode: Arc::new(decode),
            on_empty_delete: None,
        }
    }

    pub(crate) fn decode(&self, body: &[u8]) -> std::result::Result<T, String> {
        (self.decode)(body)
    }

    pub(crate) fn empty_delete_value(&self) -> Option<T> {
        self.on_empty_delete.as_ref().map(|f| f())
    }
}

/// Immutable description of one HTTP call
pub struct RequestDescriptor<T> {
    method: Method,
    url: Url,
    body: Option<Vec<u8>>,
    token: Option<AccessToken>,
    decoder: ResponseDecoder<T>,
}

impl<T> Clone for RequestDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            method: self.method,
            url: self.url.clone(),
            body: self.body.clone(),
            token: self.token.clone(),
            decoder: self.decoder.clone(),
        }
    }
}

impl<T> fmt::Debug for RequestDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("body_len", &self.body.as_ref().map(Vec::len))
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl<T> RequestDescriptor<T> {
    /// Create a new request descriptor
    pub fn new(method: Method, url: Url, decoder: ResponseDecoder<T>) -> Self {
        Self {
            method,
            url,
            body: None,
            token: None,
            decoder,
        }
    }

    /// Attach a JSON body. Ignored on the wire for methods without a body.
    pub fn json_body<B: Serialize>(mut self, body: &B) -> Result<Self> {
        let encoded =
            serde_json::to_vec(body).map_err(|e| NetworkError::Decode(e.to_string()))?;
        self.body = Some(encoded);
        Ok(self)
    }

    /// Authenticate with `Authorization: Bearer <token>`
    pub fn bearer(mut self, token: &AccessToken) -> Self {
        self.token = Some(token.clone());
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Body bytes, only when the method sends one
    pub fn body(&self) -> Option<&[u8]> {
        if self.method.carries_body() {
            self.body.as_deref()
        } else {
            None
        }
    }

    pub fn token(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }

    pub fn decoder(&self) -> &ResponseDecoder<T> {
        &self.decoder
    }
}

impl<T: DeserializeOwned + 'static> RequestDescriptor<T> {
    /// GET decoding a JSON body
    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url, ResponseDecoder::json())
    }

    /// POST decoding a JSON body
    pub fn post(url: Url) -> Self {
        Self::new(Method::Post, url, ResponseDecoder::json())
    }

    /// PATCH decoding a JSON body
    pub fn patch(url: Url) -> Self {
        Self::new(Method::Patch, url, ResponseDecoder::json())
    }
}

impl RequestDescriptor<bool> {
    /// DELETE whose 2xx answer may have no body
    pub fn delete(url: Url) -> Self {
        Self::new(Method::Delete, url, ResponseDecoder::acknowledgement())
    }
}

impl RequestDescriptor<Bytes> {
    /// GET returning the raw body
    pub fn download(url: Url) -> Self {
        Self::new(Method::Get, url, ResponseDecoder::bytes())
    }
}

/// Parse a URL, mapping failure into the crate's error type
pub fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|_| NetworkError::InvalidUrl(raw.to_string()).into())
}
