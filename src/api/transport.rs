//! HTTP transport seam between the API client and the network.

use color_eyre::{eyre::eyre, Result};
use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::error::RequestFailure;

/// A request as the client builds it.
#[derive(Debug, Clone)]
pub struct HttpRequest {
  pub method: Method,
  pub url: Url,
  pub body: Option<Value>,
}

/// Status and raw body of a response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
  pub status: u16,
  pub body: Vec<u8>,
}

impl HttpResponse {
  pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
    Self {
      status,
      body: body.into(),
    }
  }

  pub fn json(status: u16, body: &Value) -> Self {
    Self::new(status, body.to_string())
  }
}

/// Sends requests. Implementations must not interpret status codes; that is
/// the client's job.
pub trait Transport: Send + Sync {
  fn send(&self, request: HttpRequest) -> BoxFuture<'static, Result<HttpResponse, RequestFailure>>;
}

/// Transport backed by reqwest.
#[derive(Clone)]
pub struct ReqwestTransport {
  client: reqwest::Client,
}

impl ReqwestTransport {
  pub fn new(timeout: Duration, token: Option<&str>) -> Result<Self> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if let Some(token) = token {
      let value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| eyre!("Invalid API token: {}", e))?;
      headers.insert(AUTHORIZATION, value);
    }

    let client = reqwest::Client::builder()
      .default_headers(headers)
      .timeout(timeout)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client })
  }
}

impl Transport for ReqwestTransport {
  fn send(&self, request: HttpRequest) -> BoxFuture<'static, Result<HttpResponse, RequestFailure>> {
    let client = self.client.clone();
    Box::pin(async move {
      let mut builder = client.request(request.method, request.url);
      if let Some(body) = &request.body {
        builder = builder.json(body);
      }

      let response = builder
        .send()
        .await
        .map_err(|e| RequestFailure::Transport(e.to_string()))?;
      let status = response.status().as_u16();
      let body = response
        .bytes()
        .await
        .map_err(|e| RequestFailure::Transport(e.to_string()))?;

      Ok(HttpResponse {
        status,
        body: body.to_vec(),
      })
    })
  }
}

#[cfg(test)]
pub mod testing {
  //! Scripted in-memory transport for tests.

  use super::*;
  use std::sync::{Arc, Mutex};
  use tokio::sync::Semaphore;

  type Handler = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, RequestFailure> + Send + Sync>;

  /// Answers requests with a handler closure and records every request.
  ///
  /// Requests of a held method wait for [`FakeTransport::release`] before
  /// they are answered, which lets tests observe state while a request is
  /// in flight.
  pub struct FakeTransport {
    handler: Handler,
    requests: Mutex<Vec<HttpRequest>>,
    held: Option<(Method, Arc<Semaphore>)>,
  }

  impl FakeTransport {
    pub fn new<F>(handler: F) -> Self
    where
      F: Fn(&HttpRequest) -> Result<HttpResponse, RequestFailure> + Send + Sync + 'static,
    {
      Self {
        handler: Box::new(handler),
        requests: Mutex::new(Vec::new()),
        held: None,
      }
    }

    /// Hold every request with this method until released.
    pub fn hold(mut self, method: Method) -> Self {
      self.held = Some((method, Arc::new(Semaphore::new(0))));
      self
    }

    /// Let one held request through.
    pub fn release(&self) {
      if let Some((_, gate)) = &self.held {
        gate.add_permits(1);
      }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
      self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: &Method) -> usize {
      self
        .requests
        .lock()
        .unwrap()
        .iter()
        .filter(|r| &r.method == method)
        .count()
    }
  }

  impl Transport for FakeTransport {
    fn send(
      &self,
      request: HttpRequest,
    ) -> BoxFuture<'static, Result<HttpResponse, RequestFailure>> {
      self.requests.lock().unwrap().push(request.clone());
      let response = (self.handler)(&request);
      let gate = match &self.held {
        Some((method, gate)) if *method == request.method => Some(Arc::clone(gate)),
        _ => None,
      };
      Box::pin(async move {
        if let Some(gate) = gate {
          let permit = gate
            .acquire()
            .await
            .map_err(|e| RequestFailure::Transport(e.to_string()))?;
          permit.forget();
        }
        response
      })
    }
  }

  /// Query parameter `name` of a request URL.
  pub fn query_param(request: &HttpRequest, name: &str) -> Option<String> {
    request
      .url
      .query_pairs()
      .find(|(k, _)| k == name)
      .map(|(_, v)| v.into_owned())
  }
}
