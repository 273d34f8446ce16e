//! JSON encoding of [`CreateServiceName`].
//!
//! ```json
//! {
//!   "NAME": "a",
//!   "STATE": "1",
//!   "NAME_STATE_ARRAY": [{"NAME": "a", "STATE": "1"}, {"NAME": "b", "STATE": "2"}],
//!   "FAILED_CREATES": ["b"],
//!   "INIT_GROUP": ["10.0.0.1:2000"],
//!   "RECONFIGURE_UPON_ACTIVES_CHANGE": "DEFAULT",
//!   "SENDER": "10.0.0.9:4000",
//!   "IS_RESPONSE": true
//! }
//! ```

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::str::FromStr;

use reconfig_core::{ReconfigurationPolicy, ServiceName};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::create::{CreateServiceName, NameStates};
use crate::error::{PacketError, PacketResult};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct CreateWire {
    name: ServiceName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    name_state_array: Vec<NameStateWire>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    failed_creates: BTreeSet<ServiceName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    init_group: Option<BTreeSet<SocketAddr>>,
    #[serde(rename = "RECONFIGURE_UPON_ACTIVES_CHANGE")]
    policy: ReconfigurationPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sender: Option<SocketAddr>,
    #[serde(default, skip_serializing_if = "is_false")]
    is_response: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct NameStateWire {
    name: ServiceName,
    #[serde(default)]
    state: Option<String>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl From<&CreateServiceName> for CreateWire {
    fn from(req: &CreateServiceName) -> Self {
        Self {
            name: req.name.clone(),
            state: req.initial_state.clone(),
            name_state_array: req
                .name_states
                .iter()
                .map(|(name, state)| NameStateWire {
                    name: name.clone(),
                    state: Some(state.clone()),
                })
                .collect(),
            failed_creates: req.failed_creates.clone(),
            init_group: req.init_group.clone(),
            policy: req.policy,
            sender: req.sender,
            is_response: req.response,
        }
    }
}

impl From<CreateWire> for CreateServiceName {
    fn from(wire: CreateWire) -> Self {
        let name_states: NameStates = wire
            .name_state_array
            .into_iter()
            .map(|e| (e.name, e.state.unwrap_or_default()))
            .collect();

        Self {
            name: wire.name,
            initial_state: wire.state,
            name_states,
            failed_creates: wire.failed_creates,
            init_group: wire.init_group,
            policy: wire.policy,
            sender: wire.sender,
            response: wire.is_response,
        }
    }
}

impl CreateServiceName {
    pub fn to_json(&self) -> PacketResult<Value> {
        serde_json::to_value(CreateWire::from(self)).map_err(|e| PacketError::Encode(e.to_string()))
    }

    pub fn to_json_string(&self) -> PacketResult<String> {
        serde_json::to_string(&CreateWire::from(self))
            .map_err(|e| PacketError::Encode(e.to_string()))
    }

    pub fn from_json(value: Value) -> PacketResult<Self> {
        let wire: CreateWire =
            serde_json::from_value(value).map_err(|e| PacketError::Decode(e.to_string()))?;
        Ok(wire.into())
    }
}

impl FromStr for CreateServiceName {
    type Err = PacketError;

    fn from_str(s: &str) -> PacketResult<Self> {
        let wire: CreateWire =
            serde_json::from_str(s).map_err(|e| PacketError::Decode(e.to_string()))?;
        Ok(wire.into())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn abc() -> NameStates {
        [("a", "1"), ("b", "2"), ("c", "3")]
            .iter()
            .map(|(n, s)| (n.to_string(), s.to_string()))
            .collect()
    }

    #[test]
    fn batch_round_trip_keeps_map_and_policy() {
        let req =
            CreateServiceName::batch_with_policy(abc(), ReconfigurationPolicy::ReplicateAll).unwrap();
        let text = req.to_json_string().unwrap();
        let back: CreateServiceName = text.parse().unwrap();

        assert_eq!(back, req);
        assert_eq!(back.name_states(), &abc());
        assert_eq!(back.policy(), ReconfigurationPolicy::ReplicateAll);
    }

    #[test]
    fn wire_keys() {
        let sender: SocketAddr = "10.0.0.9:4000".parse().unwrap();
        let req = CreateServiceName::new("svc", "init")
            .with_init_group(["10.0.0.1:2000".parse::<SocketAddr>().unwrap()])
            .with_sender(sender)
            .with_policy(ReconfigurationPolicy::Default);
        let value = req.to_json().unwrap();

        assert_eq!(value["NAME"], "svc");
        assert_eq!(value["STATE"], "init");
        assert_eq!(value["INIT_GROUP"], json!(["10.0.0.1:2000"]));
        assert_eq!(value["RECONFIGURE_UPON_ACTIVES_CHANGE"], "DEFAULT");
        assert_eq!(value["SENDER"], "10.0.0.9:4000");
        assert!(value.get("NAME_STATE_ARRAY").is_none());
        assert!(value.get("FAILED_CREATES").is_none());
        assert!(value.get("IS_RESPONSE").is_none());

        assert_eq!(CreateServiceName::from_json(value).unwrap(), req);
    }

    #[test]
    fn response_round_trip() {
        let req = CreateServiceName::batch(abc()).unwrap();
        let resp = CreateServiceName::response_to(&req, abc(), BTreeSet::from(["c".to_string()]));
        let value = resp.to_json().unwrap();

        assert_eq!(value["IS_RESPONSE"], true);
        assert_eq!(value["FAILED_CREATES"], json!(["c"]));
        assert_eq!(CreateServiceName::from_json(value).unwrap(), resp);
    }

    #[test]
    fn missing_batch_name_rejects_packet() {
        let value = json!({
            "NAME": "a",
            "STATE": "1",
            "NAME_STATE_ARRAY": [{"NAME": "a", "STATE": "1"}, {"STATE": "2"}],
            "RECONFIGURE_UPON_ACTIVES_CHANGE": "DEFAULT"
        });
        let err = CreateServiceName::from_json(value).unwrap_err();
        assert!(matches!(err, PacketError::Decode(_)));
    }

    #[test]
    fn missing_batch_state_decodes_empty() {
        let value = json!({
            "NAME": "a",
            "NAME_STATE_ARRAY": [{"NAME": "a"}, {"NAME": "b", "STATE": "2"}],
            "RECONFIGURE_UPON_ACTIVES_CHANGE": "REPLICATE_ALL"
        });
        let req = CreateServiceName::from_json(value).unwrap();
        assert_eq!(req.name_states()["a"], "");
        assert_eq!(req.name_states()["b"], "2");
        assert_eq!(req.initial_state(), None);
    }

    #[test]
    fn missing_policy_rejects_packet() {
        let err = "{\"NAME\":\"a\",\"STATE\":\"1\"}"
            .parse::<CreateServiceName>()
            .unwrap_err();
        assert!(matches!(err, PacketError::Decode(_)));
    }

    #[test]
    fn unknown_policy_rejects_packet() {
        let value = json!({"NAME": "a", "RECONFIGURE_UPON_ACTIVES_CHANGE": "SOMETIMES"});
        assert!(CreateServiceName::from_json(value).is_err());
    }
}
