use serde_json::{Map, Value};

use crate::model::CredentialSet;

/// The runtime context a plan template is rendered against.
///
/// This is an open key/value tree (strings, booleans, numbers, lists,
/// nested mappings) because the platform and template authors may introduce
/// arbitrary keys. Sources are merged in a fixed order and later sources
/// override earlier ones on key collision:
/// instance id, request parameters, request context, resolved credentials.
#[derive(Debug, Clone, Default)]
pub struct RuntimeContext {
    values: Map<String, Value>,
}

impl RuntimeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instance_id(instance_id: &str) -> Self {
        let mut ctx = Self::new();
        ctx.insert("instance_id", Value::String(instance_id.to_string()));
        ctx
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    /// Merge a free-form JSON object into the context. Non-object values
    /// are ignored; OSB parameters and context are objects when present.
    pub fn merge_value(&mut self, value: &Value) {
        if let Value::Object(map) = value {
            for (k, v) in map {
                self.values.insert(k.clone(), v.clone());
            }
        }
    }

    pub fn merge_credentials(&mut self, credentials: &CredentialSet) {
        self.insert("credentials", credentials.to_context_value());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(Value::as_bool)
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.values.clone())
    }
}
