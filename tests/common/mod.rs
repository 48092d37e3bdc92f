#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dockhand::transport::{HttpClient, Request, Response};
use dockhand::{Config, DockerClient, Error, Result};

/// Transport that replays scripted responses and records every request.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<Response>>>,
    requests: Mutex<Vec<Request>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, status: u16, body: impl Into<Vec<u8>>) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(Response::new(status, body)));
        self
    }

    pub fn respond_json(&self, status: u16, body: serde_json::Value) -> &Self {
        self.respond(status, body.to_string())
    }

    pub fn fail(&self, message: &str) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(Error::Transport(message.to_string())));
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request(&self, index: usize) -> Request {
        self.requests()[index].clone()
    }

    /// Body of the recorded request, parsed as JSON.
    pub fn body(&self, index: usize) -> serde_json::Value {
        let body = self.request(index).body.expect("request has a body");
        serde_json::from_str(&body).unwrap()
    }
}

#[async_trait]
impl HttpClient for MockTransport {
    async fn execute(&self, request: Request) -> Result<Response> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Transport("no scripted response".to_string())))
    }
}

pub fn client(mock: &Arc<MockTransport>) -> DockerClient {
    DockerClient::new(Config::default(), mock.clone())
}

/// A 8-byte-header log frame.
pub fn frame(stream: u8, payload: &str) -> Vec<u8> {
    let mut out = vec![stream, 0, 0, 0];
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload.as_bytes());
    out
}

/// Transport whose requests never get an answer.
pub struct StalledTransport;

#[async_trait]
impl HttpClient for StalledTransport {
    async fn execute(&self, _request: Request) -> Result<Response> {
        std::future::pending().await
    }
}
