use crate::domain::context::StepContext;
use crate::domain::run::Run;
use crate::domain::step_definition::StepDefinition;
use crate::CoreError;
use std::collections::BTreeMap;

/// Gather the committed payloads of a step's dependencies.
///
/// Reads the run without mutating it, so calling this twice on the same run
/// state yields identical contexts. A dependency without a successful result
/// means the ordering logic is broken and fails with
/// `MissingDependencyResult`.
pub fn build_context(step: &StepDefinition, run: &Run) -> Result<StepContext, CoreError> {
    let mut dependencies = BTreeMap::new();

    for dep in &step.depends_on {
        let payload = run
            .completed_steps
            .payload(dep)
            .ok_or_else(|| CoreError::MissingDependencyResult {
                step: step.id.0.clone(),
                dependency: dep.0.clone(),
            })?;
        dependencies.insert(dep.clone(), payload);
    }

    let sources = step.uses_sources.then(|| run.source_documents.clone());

    Ok(StepContext {
        step_id: step.id.clone(),
        run_id: run.run_id.clone(),
        run_date: run.run_date(),
        dependencies,
        sources,
    })
}
