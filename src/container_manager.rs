use tracing::{debug, info, warn};

use crate::container::Container;
use crate::decode::{Batch, Fields};
use crate::docker_client::{DockerClient, require};
use crate::error::{Error, Result};
use crate::logs::demux;
use crate::mapper::{map_container, map_container_list};
use crate::transport::{Query, Request, encode_path};
use crate::types::{
    ContainerCreateRequest, ContainerListOptions, ContainerRecord, ContainerSummary, LogsOptions,
};

pub struct ContainerManager<'a> {
    client: &'a DockerClient,
}

impl<'a> ContainerManager<'a> {
    pub fn new(client: &'a DockerClient) -> Self {
        Self { client }
    }

    /// `GET /containers/json`. Elements that cannot be decoded are reported in
    /// [`Batch::skipped`] instead of failing the call.
    pub async fn list(&self, options: &ContainerListOptions) -> Result<Batch<ContainerSummary>> {
        let url = Query::new()
            .push_if(options.all, "all", true)
            .push_if(options.limit.is_some_and(|n| n > 0), "limit", options.limit.unwrap_or_default())
            .push_if(options.size, "size", true)
            .filters(&options.filters)
            .build("/containers/json");

        let response = self.client.expect(Request::get(url), 200).await?;
        let batch = map_container_list(&response.json());
        debug!("Listed {} containers ({} skipped)", batch.len(), batch.skipped.len());
        Ok(batch)
    }

    pub async fn inspect(&self, id: &str) -> Result<ContainerRecord> {
        require("container id", id)?;
        let url = format!("/containers/{}/json", encode_path(id));
        let response = self.client.expect(Request::get(url), 200).await?;
        Ok(map_container(&response.json()))
    }

    /// Whether a container with this id or name exists. Only a 404 means
    /// "no"; other failures are returned.
    pub async fn exists(&self, name: &str) -> Result<bool> {
        match self.inspect(name).await {
            Ok(record) => Ok(!record.id.is_empty()),
            Err(Error::ApiStatus { status: 404, .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn get(&self, id: &str) -> Result<Container<'a>> {
        let record = self.inspect(id).await?;
        Ok(Container::new(self.client, record))
    }

    /// `POST /containers/create`. Returns the new container's id.
    pub async fn create(&self, name: &str, request: &ContainerCreateRequest) -> Result<String> {
        require("image", &request.image)?;
        let url = Query::new()
            .push_nonempty("name", name)
            .build("/containers/create");

        let response = self
            .client
            .expect(Request::post(url).json(request)?, 201)
            .await?;
        let doc = response.json();
        let id = Fields::new(&doc).string("Id");
        if id.is_empty() {
            return Err(Error::ApiStatus {
                status: response.status,
                message: "container create response carries no Id".to_string(),
            });
        }
        for warning in Fields::new(&doc).strings("Warnings") {
            warn!("Engine warning creating {}: {}", name, warning);
        }
        info!("Created container {} ({})", name, id);
        Ok(id)
    }

    /// `DELETE /containers/{id}`. `volumes` also removes anonymous volumes.
    pub async fn remove(&self, id: &str, force: bool, volumes: bool) -> Result<()> {
        require("container id", id)?;
        let url = Query::new()
            .push_if(force, "force", true)
            .push_if(volumes, "v", true)
            .build(&format!("/containers/{}", encode_path(id)));
        self.client.expect(Request::delete(url), 204).await?;
        info!("Removed container {}", id);
        Ok(())
    }

    pub async fn start(&self, id: &str) -> Result<()> {
        self.lifecycle(id, "start", None).await
    }

    pub async fn stop(&self, id: &str, timeout: Option<u32>) -> Result<()> {
        self.lifecycle(id, "stop", timeout).await
    }

    pub async fn restart(&self, id: &str, timeout: Option<u32>) -> Result<()> {
        self.lifecycle(id, "restart", timeout).await
    }

    async fn lifecycle(&self, id: &str, operation: &str, timeout: Option<u32>) -> Result<()> {
        require("container id", id)?;
        let mut query = Query::new();
        if let Some(seconds) = timeout {
            query = query.push("t", seconds);
        }
        let url = query.build(&format!("/containers/{}/{}", encode_path(id), operation));
        self.client.expect(Request::post(url), 204).await?;
        info!("Container {}: {} done", id, operation);
        Ok(())
    }

    /// Buffered logs, one display line per frame.
    pub async fn logs(&self, id: &str, options: &LogsOptions) -> Result<Vec<String>> {
        require("container id", id)?;
        let url = Query::new()
            .push("stdout", options.stdout)
            .push("stderr", options.stderr)
            .push("timestamps", options.timestamps)
            .push_if(options.since > 0, "since", options.since)
            .push_if(options.until > 0, "until", options.until)
            .push_nonempty("tail", &options.tail)
            .build(&format!("/containers/{}/logs", encode_path(id)));

        let response = self.client.expect(Request::get(url), 200).await?;
        Ok(demux(&response.body))
    }
}
