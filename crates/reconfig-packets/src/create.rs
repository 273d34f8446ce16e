//! The service-creation request.
//!
//! A `CreateServiceName` is either a single create (`name` + initial
//! state) or a batch (`name_states` holds every name, `name` is the head
//! of the batch). The same type is used for the reconfigurator's reply,
//! with `response` set and any names that could not be committed listed
//! in `failed_creates`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::SocketAddr;

use reconfig_core::{ReconfigurationPolicy, ServiceName, default_policy};

use crate::error::{PacketError, PacketResult};

/// Name → initial state for a batched create.
pub type NameStates = BTreeMap<ServiceName, String>;

/// How a single name fared in a create response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// Created as requested.
    Confirmed,
    /// Part of the request, but the reconfigurator could not confirm it.
    Unconfirmed,
    /// Not part of this request at all.
    NotInRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateServiceName {
    pub(crate) name: ServiceName,
    pub(crate) initial_state: Option<String>,
    pub(crate) name_states: NameStates,
    pub(crate) failed_creates: BTreeSet<ServiceName>,
    pub(crate) init_group: Option<BTreeSet<SocketAddr>>,
    pub(crate) policy: ReconfigurationPolicy,
    pub(crate) sender: Option<SocketAddr>,
    pub(crate) response: bool,
}

impl CreateServiceName {
    /// Single-name create under the process-wide default policy.
    pub fn new(name: impl Into<ServiceName>, initial_state: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            initial_state: Some(initial_state.into()),
            name_states: NameStates::new(),
            failed_creates: BTreeSet::new(),
            init_group: None,
            policy: default_policy(),
            sender: None,
            response: false,
        }
    }

    /// Batched create. The lexicographically first name becomes the head.
    pub fn batch(name_states: NameStates) -> PacketResult<Self> {
        Self::batch_with_policy(name_states, default_policy())
    }

    pub fn batch_with_policy(
        name_states: NameStates,
        policy: ReconfigurationPolicy,
    ) -> PacketResult<Self> {
        let (head, state) = name_states
            .iter()
            .next()
            .map(|(n, s)| (n.clone(), s.clone()))
            .ok_or(PacketError::EmptyBatch)?;

        Ok(Self {
            name: head,
            initial_state: Some(state),
            name_states,
            failed_creates: BTreeSet::new(),
            init_group: None,
            policy,
            sender: None,
            response: false,
        })
    }

    /// Reply to `request`. Names in `failed_creates` are reported as
    /// unconfirmed. With an empty `name_states` the reply echoes the
    /// request's own head.
    pub fn response_to(
        request: &CreateServiceName,
        name_states: NameStates,
        failed_creates: BTreeSet<ServiceName>,
    ) -> Self {
        let (name, initial_state) = match name_states.iter().next() {
            Some((n, s)) => (n.clone(), Some(s.clone())),
            None => (request.name.clone(), request.initial_state.clone()),
        };

        Self {
            name,
            initial_state,
            name_states,
            failed_creates,
            init_group: None,
            policy: request.policy,
            sender: request.sender,
            response: true,
        }
    }

    pub fn with_init_group(mut self, group: impl IntoIterator<Item = SocketAddr>) -> Self {
        self.init_group = Some(group.into_iter().collect());
        self
    }

    pub fn with_policy(mut self, policy: ReconfigurationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sender(mut self, sender: SocketAddr) -> Self {
        self.sender = Some(sender);
        self
    }

    // ── Accessors ─────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn head_name(&self) -> &str {
        &self.name
    }

    pub fn initial_state(&self) -> Option<&str> {
        self.initial_state.as_deref()
    }

    pub fn name_states(&self) -> &NameStates {
        &self.name_states
    }

    pub fn failed_creates(&self) -> &BTreeSet<ServiceName> {
        &self.failed_creates
    }

    pub fn init_group(&self) -> Option<&BTreeSet<SocketAddr>> {
        self.init_group.as_ref()
    }

    pub fn policy(&self) -> ReconfigurationPolicy {
        self.policy
    }

    pub fn sender(&self) -> Option<SocketAddr> {
        self.sender
    }

    pub fn is_response(&self) -> bool {
        self.response
    }

    pub fn is_batched(&self) -> bool {
        !self.name_states.is_empty()
    }

    /// Number of names this request creates.
    pub fn size(&self) -> usize {
        if self.is_batched() {
            self.name_states.len()
        } else {
            1
        }
    }

    /// Every name this request creates, head included.
    pub fn names(&self) -> BTreeSet<ServiceName> {
        if self.is_batched() {
            self.name_states.keys().cloned().collect()
        } else {
            BTreeSet::from([self.name.clone()])
        }
    }

    pub fn outcome(&self, name: &str) -> CreateOutcome {
        let present = if self.is_batched() {
            self.name_states.contains_key(name)
        } else {
            self.name == name
        };

        if !present {
            CreateOutcome::NotInRequest
        } else if self.failed_creates.contains(name) {
            CreateOutcome::Unconfirmed
        } else {
            CreateOutcome::Confirmed
        }
    }

    /// Names in the request that were not confirmed.
    pub fn unconfirmed(&self) -> impl Iterator<Item = &ServiceName> {
        self.failed_creates.iter()
    }

    /// Drop the batch contents in place, leaving only the head create.
    pub fn head_only(&mut self) -> &mut Self {
        self.name_states.clear();
        self
    }
}

impl fmt::Display for CreateServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CREATE_SERVICE_NAME:{}", self.name)?;
        if self.is_batched() {
            write!(f, ":|batched|={}", self.name_states.len())?;
        }
        if !self.failed_creates.is_empty() {
            write!(f, ":|failed|={}", self.failed_creates.len())?;
        }
        if self.response {
            write!(f, ":response")?;
        }
        Ok(())
    }
}
