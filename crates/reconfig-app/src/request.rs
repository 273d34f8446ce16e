//! Application requests understood by [`NoopApp`](crate::NoopApp).

use std::fmt;

use reconfig_core::{RequestTypeId, ServiceRequest};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Stringified form of the reserved no-op request.
pub const NO_OP: &str = "NO_OP";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum AppRequestType {
    Default,
    Another,
}

impl AppRequestType {
    pub const ALL: [AppRequestType; 2] = [AppRequestType::Default, AppRequestType::Another];

    pub fn id(self) -> RequestTypeId {
        match self {
            AppRequestType::Default => 401,
            AppRequestType::Another => 402,
        }
    }
}

impl From<AppRequestType> for u32 {
    fn from(t: AppRequestType) -> u32 {
        t.id()
    }
}

impl TryFrom<u32> for AppRequestType {
    type Error = AppError;

    fn try_from(id: u32) -> AppResult<Self> {
        match id {
            401 => Ok(AppRequestType::Default),
            402 => Ok(AppRequestType::Another),
            other => Err(AppError::UnknownRequestType(other)),
        }
    }
}

/// A client request against one named service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub epoch: u32,
    #[serde(rename = "QID", default)]
    pub id: u64,
    #[serde(default)]
    pub value: String,
    #[serde(rename = "TYPE")]
    pub request_type: AppRequestType,
    #[serde(rename = "IS_STOP", default)]
    pub stop: bool,
}

impl AppRequest {
    pub fn new(name: impl Into<String>, id: u64, value: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            epoch: 0,
            id,
            value: value.into(),
            request_type: AppRequestType::Default,
            stop: false,
        }
    }

    /// The reserved request that every application accepts and ignores.
    pub fn noop() -> Self {
        Self {
            name: None,
            epoch: 0,
            id: 0,
            value: NO_OP.to_string(),
            request_type: AppRequestType::Default,
            stop: false,
        }
    }

    pub fn with_type(mut self, request_type: AppRequestType) -> Self {
        self.request_type = request_type;
        self
    }

    pub fn with_epoch(mut self, epoch: u32) -> Self {
        self.epoch = epoch;
        self
    }

    /// Mark this as the final request of an epoch.
    pub fn stop(mut self) -> Self {
        self.stop = true;
        self
    }

    pub fn is_noop(&self) -> bool {
        self.name.is_none() && self.value == NO_OP
    }

    pub fn to_json_string(&self) -> AppResult<String> {
        serde_json::to_string(self).map_err(|e| AppError::Parse(e.to_string()))
    }

    /// Decode a stringified request; the literal `NO_OP` is the no-op.
    pub fn parse(stringified: &str) -> AppResult<Self> {
        if stringified == NO_OP {
            return Ok(Self::noop());
        }
        serde_json::from_str(stringified).map_err(|e| AppError::Parse(e.to_string()))
    }
}

impl ServiceRequest for AppRequest {
    fn service_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn request_type(&self) -> RequestTypeId {
        self.request_type.id()
    }
}

impl fmt::Display for AppRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_noop() {
            return f.write_str(NO_OP);
        }
        write!(
            f,
            "{}:{}:{}:{}",
            self.name.as_deref().unwrap_or("-"),
            self.epoch,
            self.id,
            self.request_type.id()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_string_parses_to_noop() {
        let req = AppRequest::parse(NO_OP).unwrap();
        assert!(req.is_noop());
        assert_eq!(req.to_string(), NO_OP);
        assert_eq!(req.service_name(), None);
    }

    #[test]
    fn request_serializes_roundtrip() {
        let req = AppRequest::new("svc", 7, "hello")
            .with_epoch(2)
            .with_type(AppRequestType::Another);
        let json = req.to_json_string().unwrap();
        assert!(json.contains("\"TYPE\":402"));
        let back = AppRequest::parse(&json).unwrap();
        assert_eq!(back, req);
        assert_eq!(back.request_type(), 402);
    }

    #[test]
    fn unknown_type_rejected() {
        let err = AppRequest::parse(r#"{"NAME":"svc","TYPE":999}"#).unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }

    #[test]
    fn garbage_rejected() {
        assert!(AppRequest::parse("not json").is_err());
    }
}
