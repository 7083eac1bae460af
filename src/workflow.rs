use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::archive;
use crate::client::{CloudApi, MapHandle};
use crate::error::PublishError;
use crate::filter;
use crate::layer::{BoundingExtent, LayerInspector};
use crate::rest_types::{LayerDescriptor, MapDescriptor};

pub const DEFAULT_FOLDER: &str = "QGIS upload";
pub const DEFAULT_MAP_NAME: &str = "Map Project";

/// Everything one publish run needs, fixed before the run starts.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Raw dataset paths as given; empty and unsupported entries are filtered out.
    pub paths: Vec<String>,
    pub destination_folder: String,
    pub api_key: String,
    pub create_map: bool,
    pub map_name: String,
    /// Overrides the extent computed from the datasets when creating a map.
    pub extent: Option<BoundingExtent>,
}

impl UploadRequest {
    pub fn validate(&self) -> Result<(), PublishError> {
        if self.destination_folder.trim().is_empty() {
            return Err(PublishError::Validation(
                "destination folder must not be empty".to_string(),
            ));
        }
        if self.destination_folder.contains('/') {
            return Err(PublishError::Validation(format!(
                "destination folder '{}' must not contain '/'",
                self.destination_folder
            )));
        }
        if matches!(self.destination_folder.trim(), "." | "..") {
            return Err(PublishError::Validation(format!(
                "destination folder '{}' is not a folder name",
                self.destination_folder
            )));
        }
        if self.api_key.trim().is_empty() {
            return Err(PublishError::Validation("API key must not be empty".to_string()));
        }
        if self.create_map && self.map_name.trim().is_empty() {
            return Err(PublishError::Validation(
                "a map name is required to create a map".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct UploadResult {
    pub path: PathBuf,
    /// Status of the upload call, when it got that far.
    pub status: Option<u16>,
    pub error: Option<PublishError>,
}

impl UploadResult {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Default)]
pub struct UploadReport {
    pub folder: String,
    pub map: Option<MapHandle>,
    pub results: Vec<UploadResult>,
}

impl UploadReport {
    pub fn failures(&self) -> impl Iterator<Item = &UploadResult> {
        self.results.iter().filter(|r| !r.success())
    }

    /// Counts every failed stage, registration included.
    pub fn failure_summary(&self) -> Option<String> {
        let failed = self.failures().count();
        (failed > 0).then(|| format!("{} of {} datasets failed", failed, self.results.len()))
    }
}

/// Receives run progress as a percentage between 0 and 100.
pub trait ProgressSink {
    fn set_percentage(&self, percent: u8);
}

impl<F: Fn(u8)> ProgressSink for F {
    fn set_percentage(&self, percent: u8) {
        self(percent)
    }
}

/// Progress after finishing file `index` (1-based) of `total`.
pub fn progress_percent(index: usize, total: usize) -> u8 {
    let percent = index as f64 / (total + 1) as f64 * 100.0;
    percent.round().clamp(0.0, 100.0) as u8
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

pub struct PublishWorkflow<'a, C, I, P> {
    client: &'a C,
    inspector: &'a I,
    progress: &'a P,
}

impl<'a, C, I, P> PublishWorkflow<'a, C, I, P>
where
    C: CloudApi,
    I: LayerInspector,
    P: ProgressSink,
{
    pub fn new(client: &'a C, inspector: &'a I, progress: &'a P) -> Self {
        Self {
            client,
            inspector,
            progress,
        }
    }

    pub async fn run(&self, request: &UploadRequest) -> Result<UploadReport, PublishError> {
        let mut report = UploadReport {
            folder: request.destination_folder.clone(),
            ..Default::default()
        };

        // Nothing to upload is a warning even when the rest of the request is unusable.
        let filtered = filter::partition(&request.paths);
        if !filtered.rejected.is_empty() {
            debug!(rejected = filtered.rejected.len(), "Skipped unsupported files");
        }
        let datasets = filtered.accepted;
        if datasets.is_empty() {
            warn!("No valid datasets found to upload");
            return Ok(report);
        }

        request.validate()?;

        if request.create_map {
            let bounds = match request.extent {
                Some(extent) => extent,
                None => self.combined_extent(&datasets),
            };
            let map = MapDescriptor::new(request.map_name.clone(), bounds);
            let handle = self
                .client
                .create_map(&map)
                .await
                .map_err(|source| PublishError::MapCreation {
                    name: request.map_name.clone(),
                    source,
                })?;
            info!(
                map_id = handle.map_id,
                "{} was successfully uploaded to your account", request.map_name
            );
            report.map = Some(handle);
        } else {
            info!(
                "No map will be created, all files will be added to the file manager in {}",
                request.destination_folder
            );
        }

        let total = datasets.len();
        for (index, path) in datasets.into_iter().enumerate() {
            let result = self
                .publish_one(&path, &request.destination_folder, report.map)
                .await;
            if let Some(err) = &result.error {
                error!("{}", err);
            }
            report.results.push(result);
            self.progress.set_percentage(progress_percent(index + 1, total));
        }

        self.progress.set_percentage(100);
        match report.failure_summary() {
            None => info!(
                "Uploaded all valid datasets to the GIS Cloud folder {}",
                report.folder
            ),
            Some(summary) => warn!("{} for the GIS Cloud folder {}", summary, report.folder),
        }

        Ok(report)
    }

    /// Union of every dataset's extent; unknown extents count as the whole world.
    fn combined_extent(&self, datasets: &[PathBuf]) -> BoundingExtent {
        datasets
            .iter()
            .map(|path| match self.inspector.extent(path) {
                Ok(Some(extent)) => extent,
                Ok(None) => BoundingExtent::WORLD,
                Err(err) => {
                    warn!("{}; using world extent", err);
                    BoundingExtent::WORLD
                }
            })
            .reduce(|acc, extent| acc.union(&extent))
            .unwrap_or(BoundingExtent::WORLD)
    }

    async fn publish_one(
        &self,
        path: &Path,
        folder: &str,
        map: Option<MapHandle>,
    ) -> UploadResult {
        let mut result = UploadResult {
            path: path.to_path_buf(),
            status: None,
            error: None,
        };

        let archive = match archive::package(path) {
            Ok(archive) => archive,
            Err(err) => {
                result.error = Some(err);
                return result;
            }
        };

        debug!(files = ?archive.entries(), "Packaged {}", path.display());
        let uploaded = self.client.upload_archive(folder, archive.path()).await;
        drop(archive);

        match uploaded {
            Ok(status) => {
                info!(status, "Uploaded {}", path.display());
                result.status = Some(status);
            }
            Err(source) => {
                result.status = source.status();
                result.error = Some(PublishError::Upload {
                    path: path.to_path_buf(),
                    source,
                });
                return result;
            }
        }

        if let Some(map) = map {
            if let Err(err) = self.register(path, folder, map).await {
                result.error = Some(err);
            }
        }

        result
    }

    async fn register(&self, path: &Path, folder: &str, map: MapHandle) -> Result<(), PublishError> {
        let kind = self.inspector.kind(path)?;
        let name = basename(path);
        let layer = LayerDescriptor::from_upload(map.map_id, &name, folder, kind);

        self.client
            .register_layer(&layer)
            .await
            .map_err(|source| PublishError::Registration {
                name: name.clone(),
                source,
            })?;
        info!(map_id = map.map_id, kind = %kind, "Added {} to map", name);
        Ok(())
    }
}
