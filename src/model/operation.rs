use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The opaque operation tag threaded through last_operation poll requests.
/// Not a stored entity: it is reconstructed ambient to each poll from the
/// persisted plan and provider-observed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Provision,
    Update,
    Deprovision,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Provision => "provision",
            OperationType::Update => "update",
            OperationType::Deprovision => "deprovision",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "provision" => Ok(OperationType::Provision),
            "update" => Ok(OperationType::Update),
            "deprovision" => Ok(OperationType::Deprovision),
            other => Err(format!("unknown operation tag \"{}\"", other)),
        }
    }
}

/// OSB last_operation states, serialized with the protocol's exact spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LastOperationState {
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "succeeded")]
    Succeeded,
    #[serde(rename = "failed")]
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_tags_round_trip() {
        for op in [
            OperationType::Provision,
            OperationType::Update,
            OperationType::Deprovision,
        ] {
            assert_eq!(op.as_str().parse::<OperationType>().unwrap(), op);
        }
        assert!("reboot".parse::<OperationType>().is_err());
    }

    #[test]
    fn states_use_protocol_spelling() {
        assert_eq!(
            serde_json::to_string(&LastOperationState::InProgress).unwrap(),
            "\"in progress\""
        );
        assert_eq!(
            serde_json::to_string(&LastOperationState::Succeeded).unwrap(),
            "\"succeeded\""
        );
    }
}
