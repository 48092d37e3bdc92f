use serde_json::Value;
use tracing::{debug, info, warn};

use crate::decode::{Batch, Fields};
use crate::docker_client::{DockerClient, require};
use crate::error::{Error, Result};
use crate::mapper::{map_image, map_image_history, map_image_list, map_image_removed};
use crate::transport::{Query, Request, encode_path};
use crate::types::{
    ImageHistoryEntry, ImageListOptions, ImageRecord, ImageRemoved, PullOptions,
};

pub struct ImageManager<'a> {
    client: &'a DockerClient,
}

impl<'a> ImageManager<'a> {
    pub fn new(client: &'a DockerClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, options: &ImageListOptions) -> Result<Batch<ImageRecord>> {
        let url = Query::new()
            .push_if(options.all, "all", true)
            .filters(&options.filters)
            .push_if(options.shared_size, "shared-size", true)
            .push_if(options.digests, "digests", true)
            .build("/images/json");

        let response = self.client.expect(Request::get(url), 200).await?;
        let batch = map_image_list(&response.json());
        debug!("Listed {} images ({} skipped)", batch.len(), batch.skipped.len());
        Ok(batch)
    }

    /// `POST /images/create`. Waits for the whole progress stream and returns
    /// its last status line.
    pub async fn pull(&self, options: &PullOptions) -> Result<String> {
        if options.from_image.is_empty() && options.from_src.is_empty() {
            return Err(Error::InvalidArgument(
                "either an image or a source to import is required".to_string(),
            ));
        }
        let mut query = Query::new()
            .push_nonempty("fromImage", &options.from_image)
            .push_nonempty("fromSrc", &options.from_src)
            .push_nonempty("repo", &options.repo)
            .push_nonempty("tag", &options.tag)
            .push_nonempty("message", &options.message)
            .push_nonempty("platform", &options.platform);
        for change in &options.changes {
            query = query.push("changes", change);
        }

        let mut request = Request::post(query.build("/images/create"));
        if !options.registry_auth.is_empty() {
            request = request.header("X-Registry-Auth", options.registry_auth.as_str());
        }

        info!("Pulling image {}", options.from_image);
        let response = self.client.expect(request, 200).await?;
        last_pull_status(&response.text())
    }

    pub async fn exists(&self, name: &str) -> Result<bool> {
        match self.inspect(name).await {
            Ok(record) => Ok(!record.id.is_empty()),
            Err(Error::ApiStatus { status: 404, .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Pulls `name:tag` unless it is already present. An empty tag means
    /// `latest`.
    pub async fn download(&self, name: &str, tag: &str, registry_auth: &str) -> Result<String> {
        require("image name", name)?;
        let tag = if tag.is_empty() { "latest" } else { tag };
        let reference = format!("{name}:{tag}");

        if self.exists(&reference).await? {
            info!("Image {} already present", reference);
            return Ok(format!("Image '{reference}' already exists."));
        }

        let status = self
            .pull(&PullOptions {
                tag: tag.to_string(),
                registry_auth: registry_auth.to_string(),
                ..PullOptions::image(name)
            })
            .await?;
        info!("Image {} downloaded", reference);
        Ok(status)
    }

    /// `DELETE /images/{name}`. `noprune` keeps untagged parents.
    pub async fn remove(&self, name: &str, force: bool, noprune: bool) -> Result<ImageRemoved> {
        require("image name", name)?;
        let url = Query::new()
            .push_if(force, "force", true)
            .push_if(noprune, "noprune", true)
            .build(&format!("/images/{}", encode_path(name)));

        let response = self.client.expect(Request::delete(url), 200).await?;
        let removed = map_image_removed(&response.json());
        info!(
            "Removed image {} ({} untagged, {} deleted)",
            name,
            removed.untagged.len(),
            removed.deleted.len()
        );
        Ok(removed)
    }

    pub async fn inspect(&self, name: &str) -> Result<ImageRecord> {
        require("image name", name)?;
        let url = format!("/images/{}/json", encode_path(name));
        let response = self.client.expect(Request::get(url), 200).await?;
        Ok(map_image(&response.json()))
    }

    pub async fn history(&self, name: &str) -> Result<Batch<ImageHistoryEntry>> {
        require("image name", name)?;
        let url = format!("/images/{}/history", encode_path(name));
        let response = self.client.expect(Request::get(url), 200).await?;
        Ok(map_image_history(&response.json()))
    }
}

/// Walks a newline-delimited JSON progress stream. The first `error` event
/// fails the pull; otherwise the last `status` wins.
fn last_pull_status(body: &str) -> Result<String> {
    let mut last = None;
    for line in body.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let Ok(event) = serde_json::from_str::<Value>(line) else {
            warn!("Ignoring malformed progress line: {}", line);
            continue;
        };
        let event = Fields::new(&event);

        if let Some(error) = event.opt_string("error") {
            return Err(Error::Pull(error));
        }
        if let Some(status) = event.opt_string("status") {
            match event.opt_string("id") {
                Some(id) => debug!("  [{}] {}", id, status),
                None => debug!("  {}", status),
            }
            last = Some(status);
        }
    }
    Ok(last.unwrap_or_else(|| "Pull completed".to_string()))
}
