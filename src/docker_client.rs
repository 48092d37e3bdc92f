use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::container_manager::ContainerManager;
use crate::error::{Error, Result};
use crate::image_manager::ImageManager;
use crate::network_manager::NetworkManager;
use crate::transport::{HttpClient, Request, Response, SocketTransport};

/// Entry point of the library: configuration plus the transport every
/// manager sends its requests through.
#[derive(Clone)]
pub struct DockerClient {
    config: Config,
    http: Arc<dyn HttpClient>,
}

impl DockerClient {
    pub fn new(config: Config, http: Arc<dyn HttpClient>) -> Self {
        Self { config, http }
    }

    pub fn connect(config: Config) -> Self {
        let transport = SocketTransport::new(config.endpoint.clone());
        Self::new(config, Arc::new(transport))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn containers(&self) -> ContainerManager<'_> {
        ContainerManager::new(self)
    }

    pub fn images(&self) -> ImageManager<'_> {
        ImageManager::new(self)
    }

    pub fn networks(&self) -> NetworkManager<'_> {
        NetworkManager::new(self)
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_prefix(), path)
    }

    pub(crate) async fn send(&self, mut request: Request) -> Result<Response> {
        request.url = self.url(&request.url);
        debug!("{} {}", request.method, request.url);
        self.http.execute(request).await
    }

    /// Sends `request` and fails unless the engine answers with `expected`.
    pub(crate) async fn expect(&self, request: Request, expected: u16) -> Result<Response> {
        let response = self.send(request).await?;
        check_status(response, expected)
    }

    pub async fn ping(&self) -> Result<bool> {
        let response = self.expect(Request::get("/_ping"), 200).await?;
        Ok(response.text().trim() == "OK")
    }
}

pub(crate) fn check_status(response: Response, expected: u16) -> Result<Response> {
    if response.status == expected {
        return Ok(response);
    }
    let message = if response.error_message.is_empty() {
        format!("unexpected status {} (expected {})", response.status, expected)
    } else {
        response.error_message
    };
    Err(Error::ApiStatus {
        status: response.status,
        message,
    })
}

pub(crate) fn require(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument(format!("{what} cannot be empty")));
    }
    Ok(())
}
