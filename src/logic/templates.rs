use handlebars::Handlebars;
use std::collections::HashMap;
use std::path::Path;

use crate::error::BrokerError;
use crate::model::RuntimeContext;

/// Loaded plan templates. Parsed once at startup, re-rendered (never
/// re-parsed) per request; safe for unsynchronized concurrent reads.
///
/// The template engine is reachable only through [`TemplateCatalog::render`]
/// and carries the built-in substitution/conditional/iteration directives
/// only; no helper with I/O or side effects is registered.
#[derive(Debug)]
pub struct TemplateCatalog {
    registry: Handlebars<'static>,
    sources: HashMap<String, String>,
    names: Vec<String>,
}

/// Extensions accepted as plan templates: two structured formats, YAML and
/// JSON (both decode through the same YAML reader after rendering).
const TEMPLATE_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

impl TemplateCatalog {
    /// Non-recursive scan of `dir`. The logical plan name is the filename
    /// without extension. A parse failure for any file is fatal: a broken
    /// template must not silently vanish from the advertised catalog.
    pub fn load(dir: &Path) -> Result<Self, BrokerError> {
        let mut registry = Handlebars::new();
        // Output is YAML/JSON, not HTML.
        registry.register_escape_fn(handlebars::no_escape);

        let entries = std::fs::read_dir(dir).map_err(|e| {
            BrokerError::Config(format!(
                "cannot read template directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        let mut sources = HashMap::new();
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| BrokerError::Config(format!("cannot scan template directory: {}", e)))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let extension = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or_default()
                .to_ascii_lowercase();
            if !TEMPLATE_EXTENSIONS.contains(&extension.as_str()) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let source = std::fs::read_to_string(&path).map_err(|e| {
                BrokerError::Config(format!("cannot read template {}: {}", path.display(), e))
            })?;
            registry
                .register_template_string(name, &source)
                .map_err(|e| {
                    BrokerError::TemplateParse(format!("template {}: {}", path.display(), e))
                })?;
            sources.insert(name.to_string(), source);
            names.push(name.to_string());
        }

        // Stable order regardless of directory iteration order.
        names.sort();
        log::info!("loaded {} plan template(s) from {}", names.len(), dir.display());

        Ok(Self {
            registry,
            sources,
            names,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    /// Raw template source, surfaced in catalog metadata for audit.
    pub fn source(&self, name: &str) -> Option<&str> {
        self.sources.get(name).map(String::as_str)
    }

    pub fn render(&self, name: &str, context: &RuntimeContext) -> Result<String, BrokerError> {
        if !self.contains(name) {
            return Err(BrokerError::DoesNotExist(format!(
                "no plan template named \"{}\"",
                name
            )));
        }
        self.registry
            .render(name, &context.as_value())
            .map_err(|e| BrokerError::Render(format!("template \"{}\": {}", name, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn loads_only_structured_templates_non_recursively() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "basic.yaml", "name: basic");
        write(dir.path(), "other.json", "{\"name\": \"other\"}");
        write(dir.path(), "notes.txt", "ignore me");
        fs::create_dir(dir.path().join("nested")).unwrap();
        write(&dir.path().join("nested"), "hidden.yaml", "name: hidden");

        let catalog = TemplateCatalog::load(dir.path()).unwrap();
        let names: Vec<&str> = catalog.names().iter().map(String::as_str).collect();
        assert_eq!(names, ["basic", "other"]);
        assert!(catalog.source("basic").unwrap().contains("name: basic"));
    }

    #[test]
    fn parse_failure_is_fatal_for_the_whole_load() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "good.yaml", "name: good");
        write(dir.path(), "broken.yaml", "name: {{#if unclosed}}");

        let err = TemplateCatalog::load(dir.path()).unwrap_err();
        assert!(matches!(err, BrokerError::TemplateParse(_)));
    }

    #[test]
    fn missing_directory_is_a_config_error() {
        let err = TemplateCatalog::load(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, BrokerError::Config(_)));
    }

    #[test]
    fn renders_substitution_conditionals_and_iteration() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "basic.yaml",
            "name: {{ plan_name }}\n\
             {{#if paused}}paused: true\n{{/if}}\
             regions:\n{{#each regions}}  - {{ this }}\n{{/each}}",
        );
        let catalog = TemplateCatalog::load(dir.path()).unwrap();

        let mut ctx = RuntimeContext::new();
        ctx.merge_value(&serde_json::json!({
            "plan_name": "basic",
            "paused": true,
            "regions": ["EU_WEST_1", "US_EAST_1"]
        }));

        let out = catalog.render("basic", &ctx).unwrap();
        assert!(out.contains("name: basic"));
        assert!(out.contains("paused: true"));
        assert!(out.contains("- EU_WEST_1"));
        assert!(out.contains("- US_EAST_1"));
    }

    #[test]
    fn values_are_not_html_escaped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "basic.yaml", "comment: {{ comment }}");
        let catalog = TemplateCatalog::load(dir.path()).unwrap();

        let mut ctx = RuntimeContext::new();
        ctx.merge_value(&serde_json::json!({"comment": "a & b <c>"}));
        let out = catalog.render("basic", &ctx).unwrap();
        assert!(out.contains("a & b <c>"));
    }

    #[test]
    fn unknown_template_maps_to_does_not_exist() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = TemplateCatalog::load(dir.path()).unwrap();
        let err = catalog.render("ghost", &RuntimeContext::new()).unwrap_err();
        assert!(matches!(err, BrokerError::DoesNotExist(_)));
    }
}
