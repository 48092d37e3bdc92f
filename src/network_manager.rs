use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::compose::{ComposeModel, parse_compose_file};
use crate::decode::Batch;
use crate::docker_client::{DockerClient, require};
use crate::error::{Error, Result};
use crate::mapper::{map_network, map_network_created, map_network_list, map_networks_deleted};
use crate::transport::{Query, Request, encode_path};
use crate::types::{EndpointConfig, Filters, NetworkCreateRequest, NetworkCreated, NetworkRecord};

/// What happened to one network of a compose file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeNetworkAction {
    Created(NetworkCreated),
    AlreadyExists,
    /// Declared `external`; left to whoever manages it.
    External,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ConnectBody<'b> {
    container: &'b str,
    endpoint_config: &'b EndpointConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DisconnectBody<'b> {
    container: &'b str,
    force: bool,
}

pub struct NetworkManager<'a> {
    client: &'a DockerClient,
}

impl<'a> NetworkManager<'a> {
    pub fn new(client: &'a DockerClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, filters: &Filters) -> Result<Batch<NetworkRecord>> {
        let url = Query::new().filters(filters).build("/networks");
        let response = self.client.expect(Request::get(url), 200).await?;
        let batch = map_network_list(&response.json());
        debug!("Listed {} networks ({} skipped)", batch.len(), batch.skipped.len());
        Ok(batch)
    }

    pub async fn inspect(&self, id: &str) -> Result<NetworkRecord> {
        require("network id", id)?;
        let url = format!("/networks/{}", encode_path(id));
        let response = self.client.expect(Request::get(url), 200).await?;
        Ok(map_network(&response.json()))
    }

    /// Whether a network with this id or name exists. Only a 404 means "no".
    pub async fn exists(&self, id: &str) -> Result<bool> {
        match self.inspect(id).await {
            Ok(network) => Ok(!network.id().is_empty()),
            Err(Error::ApiStatus { status: 404, .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn create(&self, request: &NetworkCreateRequest) -> Result<NetworkCreated> {
        require("network name", &request.name)?;
        let response = self
            .client
            .expect(Request::post("/networks/create").json(request)?, 201)
            .await?;
        let created = map_network_created(&response.json());
        if !created.warning.is_empty() {
            warn!("Engine warning creating network {}: {}", request.name, created.warning);
        }
        info!("Created network {} ({})", request.name, created.id);
        Ok(created)
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        require("network id", id)?;
        let url = format!("/networks/{}", encode_path(id));
        self.client.expect(Request::delete(url), 204).await?;
        info!("Removed network {}", id);
        Ok(())
    }

    pub async fn connect(&self, network: &str, container: &str, endpoint: &EndpointConfig) -> Result<()> {
        require("network id", network)?;
        require("container id", container)?;
        let body = ConnectBody {
            container,
            endpoint_config: endpoint,
        };
        let url = format!("/networks/{}/connect", encode_path(network));
        self.client.expect(Request::post(url).json(&body)?, 200).await?;
        info!("Connected {} to network {}", container, network);
        Ok(())
    }

    pub async fn disconnect(&self, network: &str, container: &str, force: bool) -> Result<()> {
        require("network id", network)?;
        require("container id", container)?;
        let body = DisconnectBody { container, force };
        let url = format!("/networks/{}/disconnect", encode_path(network));
        self.client.expect(Request::post(url).json(&body)?, 200).await?;
        info!("Disconnected {} from network {}", container, network);
        Ok(())
    }

    pub async fn prune(&self, filters: &Filters) -> Result<Vec<String>> {
        let url = Query::new().filters(filters).build("/networks/prune");
        let response = self.client.expect(Request::post(url), 200).await?;
        let deleted = map_networks_deleted(&response.json());
        info!("Pruned {} networks", deleted.len());
        Ok(deleted)
    }

    pub async fn create_from_compose(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Vec<(String, ComposeNetworkAction)>> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(Error::InvalidArgument("compose file path cannot be empty".to_string()));
        }
        let model = parse_compose_file(path)?;
        self.create_from_compose_model(&model).await
    }

    /// Creates every network the model declares, in name order. External
    /// networks and networks that already exist are left alone. The first
    /// failure stops the run.
    pub async fn create_from_compose_model(
        &self,
        model: &ComposeModel,
    ) -> Result<Vec<(String, ComposeNetworkAction)>> {
        if model.networks.is_empty() {
            return Err(Error::InvalidArgument(
                "no networks found in the compose file".to_string(),
            ));
        }

        let mut outcome = Vec::with_capacity(model.networks.len());
        for (name, spec) in &model.networks {
            let action = if spec.external {
                debug!("Network {} is external, skipping", name);
                ComposeNetworkAction::External
            } else if self.exists(name).await? {
                info!("Network {} already exists", name);
                ComposeNetworkAction::AlreadyExists
            } else {
                ComposeNetworkAction::Created(self.create(&spec.to_create_request(name)).await?)
            };
            outcome.push((name.clone(), action));
        }
        Ok(outcome)
    }
}
