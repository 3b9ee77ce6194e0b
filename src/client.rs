use std::collections::HashMap;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONNECTION, USER_AGENT};
use reqwest::{redirect, Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::auth::Credentials;
use crate::config::ClientConfig;
use crate::error::D1Error;
use crate::request::RequestType;
use crate::response::{decode_identifier, decode_xml};
use crate::types::Identifier;

/// The REST client every node proxy talks through.
///
/// A `BaseClient` is bound to one node's base URL and API version. The
/// wrapped `reqwest::Client` is cheap to clone and shares its connection
/// pool, so all clients built from one context reuse the same connections.
#[derive(Debug, Clone)]
pub struct BaseClient {
    base_url: Url,
    api_version: String,
    client: Client,
}

impl BaseClient {
    /// Creates a client with its own connection pool.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The node's base URL, e.g. `https://cn.dataone.org/cn`.
    /// * `config` - Pool, timeout and API version settings.
    /// * `credentials` - How requests authenticate.
    pub fn new(
        base_url: &str,
        config: &ClientConfig,
        credentials: &Credentials,
    ) -> Result<Self, D1Error> {
        let client = build_http_client(config, credentials)?;
        Self::with_client(base_url, &config.api_version, client)
    }

    /// Creates a client on top of an existing pool.
    pub fn with_client(base_url: &str, api_version: &str, client: Client) -> Result<Self, D1Error> {
        Ok(BaseClient {
            base_url: normalize_base_url(base_url)?,
            api_version: api_version.trim_matches('/').to_string(),
            client,
        })
    }

    /// The base URL, always ending with `/`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// The underlying pooled HTTP client.
    pub fn http(&self) -> &Client {
        &self.client
    }

    /// Builds `<base>/<api version>/<segments…>`.
    ///
    /// Each segment is percent-encoded on its own, so an identifier holding
    /// `/`, `?` or spaces stays a single path segment. An empty last segment
    /// yields a trailing slash.
    pub fn build_url(&self, segments: &[&str]) -> Result<Url, D1Error> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                D1Error::client_message(format!("{} cannot be a base URL", self.base_url))
            })?;
            path.pop_if_empty();
            if !self.api_version.is_empty() {
                path.push(&self.api_version);
            }
            path.extend(segments);
        }
        Ok(url)
    }

    pub async fn get(
        &self,
        segments: &[&str],
        parameters: Option<HashMap<String, String>>,
        context: RequestType,
        header_map: Option<HeaderMap>,
    ) -> Result<reqwest::Response, D1Error> {
        self.perform_request(Method::GET, segments, parameters, context, header_map)
            .await
    }

    pub async fn post(
        &self,
        segments: &[&str],
        parameters: Option<HashMap<String, String>>,
        context: RequestType,
        header_map: Option<HeaderMap>,
    ) -> Result<reqwest::Response, D1Error> {
        self.perform_request(Method::POST, segments, parameters, context, header_map)
            .await
    }

    pub async fn put(
        &self,
        segments: &[&str],
        parameters: Option<HashMap<String, String>>,
        context: RequestType,
        header_map: Option<HeaderMap>,
    ) -> Result<reqwest::Response, D1Error> {
        self.perform_request(Method::PUT, segments, parameters, context, header_map)
            .await
    }

    pub async fn delete(
        &self,
        segments: &[&str],
        parameters: Option<HashMap<String, String>>,
        context: RequestType,
        header_map: Option<HeaderMap>,
    ) -> Result<reqwest::Response, D1Error> {
        self.perform_request(Method::DELETE, segments, parameters, context, header_map)
            .await
    }

    pub async fn head(
        &self,
        segments: &[&str],
        parameters: Option<HashMap<String, String>>,
        header_map: Option<HeaderMap>,
    ) -> Result<reqwest::Response, D1Error> {
        self.perform_request(
            Method::HEAD,
            segments,
            parameters,
            RequestType::Plain,
            header_map,
        )
        .await
    }

    async fn perform_request(
        &self,
        method: Method,
        segments: &[&str],
        parameters: Option<HashMap<String, String>>,
        context: RequestType,
        header_map: Option<HeaderMap>,
    ) -> Result<reqwest::Response, D1Error> {
        let url = self.build_url(segments)?;

        tracing::debug!(method = %method, url = %url, "dispatching request");

        let request = context
            .to_request(self.client.request(method, url))
            .await?;

        let request = match parameters {
            Some(parameters) => request.query(&parameters),
            None => request,
        };

        let request = match header_map {
            Some(headers) => request.headers(headers),
            None => request,
        };

        Ok(request.send().await?)
    }
}

/// Parses a base URL and makes sure its path ends with `/`.
fn normalize_base_url(base_url: &str) -> Result<Url, D1Error> {
    let mut url = Url::parse(base_url.trim())
        .map_err(|e| D1Error::client_side(format!("Invalid base URL {base_url}"), Some(e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(D1Error::client_message(format!(
            "Unsupported scheme in base URL {base_url}"
        )));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

/// Builds the pooled HTTP client shared by all nodes of a context.
///
/// Redirects are not followed: a CN answers `resolve` with `303 See Other`
/// and the location list in the body.
pub fn build_http_client(
    config: &ClientConfig,
    credentials: &Credentials,
) -> Result<Client, D1Error> {
    let mut headers = default_headers(config)?;

    let builder = Client::builder()
        .timeout(config.timeout())
        .connect_timeout(config.connect_timeout())
        .pool_idle_timeout(config.pool_idle_timeout())
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .redirect(redirect::Policy::none());

    let builder = credentials.apply(builder, &mut headers)?;

    builder
        .default_headers(headers)
        .build()
        .map_err(|e| D1Error::client_side("Could not build the HTTP client", Some(e)))
}

fn default_headers(config: &ClientConfig) -> Result<HeaderMap, D1Error> {
    let mut headers = HeaderMap::new();

    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(ACCEPT, HeaderValue::from_static("text/xml, application/xml, */*"));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&config.user_agent).map_err(|e| {
            D1Error::client_side("User agent contains invalid characters", Some(e))
        })?,
    );

    Ok(headers)
}

fn is_success(status: StatusCode) -> bool {
    status.is_success() || status == StatusCode::SEE_OTHER
}

/// Reads a response, mapping failed statuses to a [`D1Error`].
///
/// # Returns
///
/// The headers and body of a successful (2xx or 303) response.
pub async fn evaluate_response(
    response: reqwest::Response,
) -> Result<(HeaderMap, Bytes), D1Error> {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?;

    if is_success(status) {
        Ok((headers, body))
    } else {
        Err(map_failure(status, &headers, &body))
    }
}

/// Fails with the mapped exception unless the status is a success, leaving
/// the body unread for streaming.
pub async fn evaluate_status(response: reqwest::Response) -> Result<reqwest::Response, D1Error> {
    let status = response.status();
    if is_success(status) {
        return Ok(response);
    }

    let headers = response.headers().clone();
    let body = response.bytes().await?;
    Err(map_failure(status, &headers, &body))
}

fn map_failure(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> D1Error {
    let error = D1Error::from_response_parts(status.as_u16(), headers, body);
    tracing::warn!(
        status = status.as_u16(),
        kind = %error.kind,
        detail_code = %error.detail_code,
        "node returned an exception"
    );
    error
}

/// Decodes an XML document from a successful response.
pub async fn evaluate_xml<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, D1Error> {
    let (_, body) = evaluate_response(response).await?;
    decode_xml(&body)
}

/// Decodes an `<d1:identifier>` document from a successful response.
pub async fn evaluate_identifier(response: reqwest::Response) -> Result<Identifier, D1Error> {
    let (_, body) = evaluate_response(response).await?;
    decode_identifier(&body)
}

pub async fn evaluate_bytes(response: reqwest::Response) -> Result<Bytes, D1Error> {
    Ok(evaluate_response(response).await?.1)
}

pub async fn evaluate_text(response: reqwest::Response) -> Result<String, D1Error> {
    let body = evaluate_bytes(response).await?;
    String::from_utf8(body.to_vec())
        .map_err(|e| D1Error::client_side("Response body is not valid UTF-8", Some(e)))
}
