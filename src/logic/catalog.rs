use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::config::ServiceSettings;
use crate::error::BrokerError;
use crate::logic::render::render_plan;
use crate::logic::templates::TemplateCatalog;
use crate::model::{deterministic_id, Catalog, CredentialSet, RuntimeContext, Service, ServicePlan};

/// Restricts which provider/instance-size combinations are advertised.
/// Maps provider name to allowed instance sizes; an empty whitelist allows
/// everything.
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    allowed: HashMap<String, HashSet<String>>,
}

impl Whitelist {
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Load from a JSON file of shape `{"AWS": ["M10", "M20"], ...}`.
    pub fn load(path: &Path) -> Result<Self, BrokerError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BrokerError::Config(format!("cannot read whitelist {}: {}", path.display(), e))
        })?;
        let allowed: HashMap<String, HashSet<String>> = serde_json::from_str(&raw)
            .map_err(|e| BrokerError::Config(format!("malformed whitelist: {}", e)))?;
        Ok(Self { allowed })
    }

    pub fn allows(&self, provider: &str, instance_size: &str) -> bool {
        if self.allowed.is_empty() {
            return true;
        }
        self.allowed
            .get(provider)
            .map(|sizes| sizes.contains(instance_size))
            .unwrap_or(false)
    }
}

/// The advertised catalog plus the reverse index lifecycle calls use to map
/// an OSB plan id back to its template.
#[derive(Debug, Clone)]
pub struct BuiltCatalog {
    pub catalog: Catalog,
    pub service_id: String,
    /// plan id -> template name
    pub plan_index: HashMap<String, String>,
}

impl BuiltCatalog {
    pub fn template_for_plan(&self, plan_id: &str) -> Option<&str> {
        self.plan_index.get(plan_id).map(String::as_str)
    }
}

/// Render every template with a no-instance context (credentials only) and
/// assemble the advertised catalog. Individual render/decode/validation
/// failures exclude that plan with a warning; they never abort the build.
pub fn build_catalog(
    templates: &TemplateCatalog,
    credentials: &CredentialSet,
    whitelist: &Whitelist,
    service: &ServiceSettings,
) -> BuiltCatalog {
    let mut base_context = RuntimeContext::new();
    base_context.merge_credentials(credentials);

    let mut plans = Vec::new();
    let mut plan_index = HashMap::new();
    for name in templates.names() {
        let plan = match render_plan(templates, name, &base_context) {
            Ok(plan) => plan,
            Err(err) => {
                log::warn!("excluding plan template \"{}\" from catalog: {}", name, err);
                continue;
            }
        };

        let provider = &plan.cluster.provider_settings.provider_name;
        let instance_size = &plan.cluster.provider_settings.instance_size_name;
        if !whitelist.allows(provider, instance_size) {
            log::info!(
                "plan \"{}\" ({}/{}) not whitelisted, dropping from catalog",
                plan.name,
                provider,
                instance_size
            );
            continue;
        }

        let plan_id = deterministic_id("plan", &format!("{}/{}", provider, plan.name));

        let mut metadata = Map::new();
        metadata.insert("providerName".into(), Value::String(provider.clone()));
        metadata.insert(
            "instanceSizeName".into(),
            Value::String(instance_size.clone()),
        );
        if let Some(source) = templates.source(name) {
            metadata.insert("template".into(), Value::String(source.to_string()));
        }
        if let Ok(redacted) = serde_json::to_value(plan.redacted()) {
            metadata.insert("plan".into(), redacted);
        }

        plan_index.insert(plan_id.clone(), name.clone());
        plans.push(ServicePlan {
            id: plan_id,
            name: plan.name.clone(),
            description: plan.description.clone(),
            free: plan.free,
            metadata,
        });
    }

    let service_id = deterministic_id("service", &service.name);
    let mut service_metadata = Map::new();
    service_metadata.insert(
        "displayName".into(),
        Value::String(service.display_name.clone()),
    );

    let catalog = Catalog {
        services: vec![Service {
            id: service_id.clone(),
            name: service.name.clone(),
            description: service.description.clone(),
            bindable: true,
            instances_retrievable: false,
            bindings_retrievable: false,
            plan_updateable: true,
            plans,
            metadata: service_metadata,
        }],
    };

    BuiltCatalog {
        catalog,
        service_id,
        plan_index,
    }
}
