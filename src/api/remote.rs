//! The remote collaborator the data service talks to.

use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Post,
  Patch,
}

impl Method {
  pub fn as_str(&self) -> &'static str {
    match self {
      Method::Get => "GET",
      Method::Post => "POST",
      Method::Patch => "PATCH",
    }
  }
}

/// An HTTP-like request: method, endpoint path, query parameters, JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRequest {
  pub method: Method,
  /// Endpoint path, e.g. `/tasks/task-3`
  pub path: String,
  pub params: Vec<(String, String)>,
  pub body: Option<Value>,
}

impl RemoteRequest {
  pub fn new(method: Method, path: impl Into<String>) -> Self {
    Self {
      method,
      path: path.into(),
      params: Vec::new(),
      body: None,
    }
  }

  pub fn get(path: impl Into<String>) -> Self {
    Self::new(Method::Get, path)
  }

  pub fn post(path: impl Into<String>, body: Value) -> Self {
    Self::new(Method::Post, path).with_body(body)
  }

  pub fn patch(path: impl Into<String>, body: Value) -> Self {
    Self::new(Method::Patch, path).with_body(body)
  }

  pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
    self.params = params;
    self
  }

  pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.params.push((name.into(), value.into()));
    self
  }

  pub fn with_body(mut self, body: Value) -> Self {
    self.body = Some(body);
    self
  }

  /// Non-empty path segments.
  pub fn segments(&self) -> Vec<&str> {
    self.path.split('/').filter(|s| !s.is_empty()).collect()
  }
}

/// Anything that can answer a `RemoteRequest` with JSON.
///
/// Implementations report a missing entity as `Error::NotFound` and any other
/// failure as `Error::Remote`.
pub trait Remote: Send + Sync {
  fn send(&self, request: RemoteRequest) -> impl Future<Output = Result<Value>> + Send;
}

impl<R: Remote> Remote for Arc<R> {
  fn send(&self, request: RemoteRequest) -> impl Future<Output = Result<Value>> + Send {
    (**self).send(request)
  }
}
