use std::{future::Future, path::Path, time::Duration};

use reqwest::{Client, RequestBuilder, Response, header::LOCATION, multipart};
use tracing::{debug, warn};
use url::Url;

use crate::error::CloudError;
use crate::rest_types::{LayerDescriptor, MapDescriptor};

pub const DEFAULT_BASE_URL: &str = "https://api.giscloud.com/1/";
const API_VERSION: &str = "1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

const MAPS_ROUTE: &str = "maps.json";
const LAYERS_ROUTE: &str = "layers.json";
const STORAGE_ROUTE: &str = "storage/fs/";

/// Identifier of a map created on GIS Cloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapHandle {
    pub map_id: u64,
}

/// The three GIS Cloud operations the publish workflow needs.
pub trait CloudApi {
    /// Uploads a zip archive into a file manager folder, returning the HTTP status.
    fn upload_archive(
        &self,
        folder: &str,
        archive: &Path,
    ) -> impl Future<Output = Result<u16, CloudError>> + Send;

    fn create_map(
        &self,
        map: &MapDescriptor,
    ) -> impl Future<Output = Result<MapHandle, CloudError>> + Send;

    fn register_layer(
        &self,
        layer: &LayerDescriptor,
    ) -> impl Future<Output = Result<u16, CloudError>> + Send;
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: Url,
    pub api_key: String,
    pub timeout: Duration,
    /// Skips TLS certificate verification. Only for servers with broken certificates.
    pub accept_invalid_certs: bool,
}

impl ClientOptions {
    pub fn new(base_url: Url, api_key: String) -> Self {
        Self {
            base_url,
            api_key,
            timeout: DEFAULT_TIMEOUT,
            accept_invalid_certs: false,
        }
    }
}

pub struct GisCloudClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl GisCloudClient {
    pub fn new(options: ClientOptions) -> Result<Self, CloudError> {
        if options.accept_invalid_certs {
            warn!("TLS certificate verification is disabled for {}", options.base_url);
        }

        let client = Client::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .build()
            .map_err(|source| CloudError::Transport {
                url: options.base_url.to_string(),
                source,
            })?;

        Ok(Self {
            client,
            base_url: with_trailing_slash(options.base_url),
            api_key: options.api_key,
        })
    }

    fn endpoint(&self, route: &str) -> Url {
        // Routes are relative and the base always ends in '/', so join cannot fail.
        self.base_url
            .join(route)
            .unwrap_or_else(|_| self.base_url.clone())
    }

    /// Upload URL for `folder`, which always lands in a single path segment.
    fn storage_endpoint(&self, folder: &str) -> Url {
        let mut url = self.endpoint(STORAGE_ROUTE);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(folder);
        }
        url
    }

    fn post(&self, url: Url) -> RequestBuilder {
        self.client
            .post(url)
            .header("API-Version", API_VERSION)
            .header("API-Key", &self.api_key)
    }

    async fn send(&self, url: &Url, request: RequestBuilder) -> Result<Response, CloudError> {
        let response = request.send().await.map_err(|source| CloudError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "GIS Cloud responded");

        if !status.is_success() {
            return Err(CloudError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response)
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Extracts the map id from a `Location` header such as `https://api.giscloud.com/1/maps/4821`.
pub fn parse_map_id(location: &str) -> Result<u64, CloudError> {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse::<u64>().ok())
        .ok_or_else(|| CloudError::MalformedLocation(location.to_string()))
}

impl CloudApi for GisCloudClient {
    async fn upload_archive(&self, folder: &str, archive: &Path) -> Result<u16, CloudError> {
        let url = self.storage_endpoint(folder);

        let file = multipart::Part::file(archive)
            .await
            .map_err(|source| CloudError::Archive {
                path: archive.to_path_buf(),
                source,
            })?;
        let form = multipart::Form::new().part("file", file);

        let response = self.send(&url, self.post(url.clone()).multipart(form)).await?;
        Ok(response.status().as_u16())
    }

    async fn create_map(&self, map: &MapDescriptor) -> Result<MapHandle, CloudError> {
        let url = self.endpoint(MAPS_ROUTE);

        let response = self.send(&url, self.post(url.clone()).json(map)).await?;

        let location = response
            .headers()
            .get(LOCATION)
            .ok_or(CloudError::MissingLocation)?
            .to_str()
            .map_err(|_| CloudError::MalformedLocation("<non-ascii header>".to_string()))?;

        Ok(MapHandle {
            map_id: parse_map_id(location)?,
        })
    }

    async fn register_layer(&self, layer: &LayerDescriptor) -> Result<u16, CloudError> {
        let url = self.endpoint(LAYERS_ROUTE);

        let response = self.send(&url, self.post(url.clone()).json(layer)).await?;
        Ok(response.status().as_u16())
    }
}
