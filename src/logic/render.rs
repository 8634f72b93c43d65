use crate::error::BrokerError;
use crate::logic::templates::TemplateCatalog;
use crate::model::{Plan, RuntimeContext};

/// Render one template against a merged runtime context and decode the
/// result into a validated plan. Render, decode, and validation failures
/// are distinct error variants: during catalog construction they demote a
/// single plan, during a lifecycle call they are fatal to that call.
pub fn render_plan(
    templates: &TemplateCatalog,
    name: &str,
    context: &RuntimeContext,
) -> Result<Plan, BrokerError> {
    let rendered = templates.render(name, context)?;

    // serde_yaml accepts JSON documents too, covering both template formats.
    let mut plan: Plan = serde_yaml::from_str(&rendered)
        .map_err(|e| BrokerError::Decode(format!("plan \"{}\": {}", name, e)))?;

    if plan.name.is_empty() {
        plan.name = name.to_string();
    }
    plan.validate().map_err(BrokerError::Validation)?;
    Ok(plan)
}
