//! Reference application: one string of state per service name.

use std::collections::{BTreeSet, HashMap};

use reconfig_core::{RequestTypeId, ServiceName};
use tracing::{debug, info};

use crate::app::ReplicatedApplication;
use crate::error::AppResult;
use crate::request::{AppRequest, AppRequestType};

/// Keeps the last written value of every service it hosts.
#[derive(Debug, Default)]
pub struct NoopApp {
    node: String,
    states: HashMap<ServiceName, String>,
}

impl NoopApp {
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            states: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn write(&mut self, request: &AppRequest) -> bool {
        let Some(name) = request.name.as_deref() else {
            return true;
        };
        if request.stop {
            debug!(node = %self.node, name, epoch = request.epoch, "stop request");
            return true;
        }
        match self.states.get_mut(name) {
            Some(state) => {
                *state = request.value.clone();
                debug!(node = %self.node, name, id = request.id, "wrote state");
                true
            }
            None => {
                debug!(node = %self.node, name, id = request.id, "no record for name");
                false
            }
        }
    }
}

impl ReplicatedApplication for NoopApp {
    type Request = AppRequest;

    fn execute(&mut self, request: &AppRequest) -> bool {
        if request.is_noop() {
            return true;
        }
        match request.request_type {
            AppRequestType::Default => self.write(request),
            AppRequestType::Another => false,
        }
    }

    fn checkpoint(&self, name: &str) -> Option<String> {
        self.states.get(name).cloned()
    }

    fn restore(&mut self, name: &str, state: Option<&str>) -> bool {
        match state {
            Some(state) => match self.states.get_mut(name) {
                Some(current) => {
                    debug!(node = %self.node, name, "updating");
                    *current = state.to_string();
                }
                None => {
                    info!(node = %self.node, name, "creating");
                    self.states.insert(name.to_string(), state.to_string());
                }
            },
            None => {
                if let Some(final_state) = self.states.remove(name) {
                    info!(node = %self.node, name, final_state = %final_state, "deleting");
                }
            }
        }
        true
    }

    fn request_types(&self) -> BTreeSet<RequestTypeId> {
        AppRequestType::ALL.iter().map(|t| t.id()).collect()
    }

    fn parse_request(&self, stringified: &str) -> AppResult<AppRequest> {
        AppRequest::parse(stringified)
    }
}
