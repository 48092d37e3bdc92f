//! Live handle on a container.
//!
//! [`ContainerRecord`] is plain data. [`Container`] pairs one with the client
//! it came from so lifecycle calls can be made on it directly; the record is
//! only ever replaced as a whole by [`Container::refresh`].

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::docker_client::DockerClient;
use crate::error::Result;
use crate::types::{ContainerRecord, LogsOptions};

pub struct Container<'a> {
    client: &'a DockerClient,
    record: ContainerRecord,
}

impl<'a> Container<'a> {
    pub fn new(client: &'a DockerClient, record: ContainerRecord) -> Self {
        Self { client, record }
    }

    pub fn record(&self) -> &ContainerRecord {
        &self.record
    }

    pub fn into_record(self) -> ContainerRecord {
        self.record
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub async fn refresh(&mut self) -> Result<()> {
        self.record = self.client.containers().inspect(&self.record.id).await?;
        Ok(())
    }

    pub async fn start(&self) -> Result<()> {
        self.client.containers().start(&self.record.id).await
    }

    pub async fn run(&mut self) -> Result<()> {
        self.start().await?;
        self.refresh().await
    }

    pub async fn stop(&self, timeout: Option<u32>) -> Result<()> {
        self.client.containers().stop(&self.record.id, timeout).await
    }

    pub async fn restart(&self, timeout: Option<u32>) -> Result<()> {
        self.client.containers().restart(&self.record.id, timeout).await
    }

    /// Removes the container. The handle is consumed; its last record is
    /// returned.
    pub async fn remove(self, force: bool, volumes: bool) -> Result<ContainerRecord> {
        self.client
            .containers()
            .remove(&self.record.id, force, volumes)
            .await?;
        Ok(self.record)
    }

    pub async fn logs(&self, options: &LogsOptions) -> Result<Vec<String>> {
        self.client.containers().logs(&self.record.id, options).await
    }

    /// The last `lines` lines of both output streams, with timestamps.
    pub async fn recent_logs(&self, lines: usize) -> Result<Vec<String>> {
        let options = LogsOptions {
            timestamps: true,
            tail: lines.to_string(),
            ..LogsOptions::default()
        };
        self.logs(&options).await
    }

    /// Replays the container's current logs to `callback` on a background
    /// task and returns immediately. Must be called from within a Tokio
    /// runtime.
    ///
    /// With a `max_duration` the task ends once that much time has passed,
    /// including time spent waiting for the engine. A failed or timed-out
    /// fetch is reported through the callback as a single
    /// `Error following logs: ...` line.
    pub fn follow_logs<F>(&self, callback: F, max_duration: Option<Duration>)
    where
        F: Fn(&str) + Send + 'static,
    {
        let client = self.client.clone();
        let id = self.record.id.clone();
        let options = LogsOptions {
            timestamps: true,
            ..LogsOptions::default()
        };

        tokio::spawn(async move {
            let started = Instant::now();
            let containers = client.containers();
            let fetch = containers.logs(&id, &options);
            let fetched = match max_duration {
                Some(limit) => match tokio::time::timeout(limit, fetch).await {
                    Ok(fetched) => fetched,
                    Err(_) => {
                        callback(&format!("Error following logs: no response within {limit:?}"));
                        return;
                    }
                },
                None => fetch.await,
            };
            let lines = match fetched {
                Ok(lines) => lines,
                Err(e) => {
                    callback(&format!("Error following logs: {e}"));
                    return;
                }
            };
            for line in &lines {
                callback(line);
                if max_duration.is_some_and(|limit| started.elapsed() >= limit) {
                    debug!("Stopped following logs of {} after {:?}", id, started.elapsed());
                    break;
                }
            }
        });
    }
}
