use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single provider API key pair, scoped to a project or an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    #[serde(default)]
    pub public_key: String,
    #[serde(default)]
    pub private_key: String,
    /// Project this key is scoped to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Organization this key is scoped to. Accepted in the bundle shape but
    /// rejected at validation: fan-out to member projects is unimplemented.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
}

impl Credential {
    pub fn is_empty(&self) -> bool {
        self.public_key.is_empty() && self.private_key.is_empty()
    }
}

/// Basic-auth credential the platform uses against the broker itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerAuth {
    pub username: String,
    pub password: String,
}

/// The raw bundle shape accepted from the environment or a platform
/// secret binding.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialBundle {
    pub broker: BrokerAuth,
    #[serde(default)]
    pub keys: BTreeMap<String, Credential>,
}

/// Validated credentials: exactly one broker-auth credential plus at least
/// one project-scoped provider key. Built once at startup and shared
/// read-only by every request handler.
#[derive(Debug, Clone)]
pub struct CredentialSet {
    pub broker: BrokerAuth,
    /// Keyed by project id.
    pub projects: BTreeMap<String, Credential>,
}

impl CredentialSet {
    pub fn from_bundle(bundle: CredentialBundle) -> Result<Self, String> {
        if bundle.broker.username.is_empty() || bundle.broker.password.is_empty() {
            return Err("credential bundle is missing the broker basic-auth credential".into());
        }

        let mut projects = BTreeMap::new();
        for (alias, key) in bundle.keys {
            if key.is_empty() {
                return Err(format!("credential \"{}\" has an empty key pair", alias));
            }
            if let Some(org) = &key.org_id {
                if key.project_id.is_none() {
                    // Deliberate rejection: we will not guess which projects
                    // an org-scoped key should be allowed to touch.
                    return Err(format!(
                        "credential \"{}\" is scoped to organization {}; \
                         org-level keys are not supported, supply project-scoped keys",
                        alias, org
                    ));
                }
            }
            match &key.project_id {
                Some(project_id) => {
                    projects.insert(project_id.clone(), key);
                }
                None => {
                    return Err(format!(
                        "credential \"{}\" has no project scope (projectId missing)",
                        alias
                    ));
                }
            }
        }

        if projects.is_empty() {
            return Err(
                "credential bundle must contain at least one project-scoped API key".into(),
            );
        }

        Ok(Self {
            broker: bundle.broker,
            projects,
        })
    }

    pub fn by_project(&self, project_id: &str) -> Option<&Credential> {
        self.projects.get(project_id)
    }

    /// First project credential in scope order, used when a plan does not
    /// name an API key of its own.
    pub fn first_project(&self) -> &Credential {
        self.projects
            .values()
            .next()
            .expect("CredentialSet always holds at least one project credential")
    }

    /// Context fragment exposed to templates under the `credentials` key.
    /// The first project key is flattened to the top level so simple plans
    /// can reference `credentials.publicKey` directly.
    pub fn to_context_value(&self) -> serde_json::Value {
        let first = self.first_project();
        let first_project_id = first.project_id.clone().unwrap_or_default();
        let mut projects = serde_json::Map::new();
        for (project_id, key) in &self.projects {
            projects.insert(
                project_id.clone(),
                serde_json::json!({
                    "publicKey": key.public_key,
                    "privateKey": key.private_key,
                }),
            );
        }
        serde_json::json!({
            "publicKey": first.public_key,
            "privateKey": first.private_key,
            "projectId": first_project_id,
            "projects": projects,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(json: serde_json::Value) -> CredentialBundle {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn valid_bundle_resolves() {
        let set = CredentialSet::from_bundle(bundle(serde_json::json!({
            "broker": {"username": "admin", "password": "secret"},
            "keys": {
                "main": {"publicKey": "pub", "privateKey": "priv", "projectId": "p1"}
            }
        })))
        .unwrap();
        assert_eq!(set.broker.username, "admin");
        assert_eq!(set.by_project("p1").unwrap().public_key, "pub");
        assert_eq!(set.first_project().private_key, "priv");
    }

    #[test]
    fn broker_credential_alone_is_invalid() {
        let err = CredentialSet::from_bundle(bundle(serde_json::json!({
            "broker": {"username": "admin", "password": "secret"},
            "keys": {}
        })))
        .unwrap_err();
        assert!(err.contains("at least one project-scoped"));
    }

    #[test]
    fn project_keys_alone_are_invalid() {
        let err = CredentialSet::from_bundle(bundle(serde_json::json!({
            "broker": {"username": "", "password": ""},
            "keys": {
                "main": {"publicKey": "pub", "privateKey": "priv", "projectId": "p1"}
            }
        })))
        .unwrap_err();
        assert!(err.contains("broker basic-auth"));
    }

    #[test]
    fn org_scoped_keys_are_rejected() {
        let err = CredentialSet::from_bundle(bundle(serde_json::json!({
            "broker": {"username": "admin", "password": "secret"},
            "keys": {
                "org": {"publicKey": "pub", "privateKey": "priv", "orgId": "o1"}
            }
        })))
        .unwrap_err();
        assert!(err.contains("org-level keys are not supported"));
    }

    #[test]
    fn context_value_flattens_first_project() {
        let set = CredentialSet::from_bundle(bundle(serde_json::json!({
            "broker": {"username": "admin", "password": "secret"},
            "keys": {
                "main": {"publicKey": "pub", "privateKey": "priv", "projectId": "p1"}
            }
        })))
        .unwrap();
        let value = set.to_context_value();
        assert_eq!(value["projectId"], "p1");
        assert_eq!(value["projects"]["p1"]["publicKey"], "pub");
    }
}
