use crate::types::SubTask;
use conductor_core::{ConductorError, ConductorResult};
use std::collections::HashSet;
use tracing::warn;

/// Orders subtasks so that dependencies run first.
///
/// Among the subtasks whose dependencies are satisfied, the one with the
/// highest priority is taken next; ties go to the earlier subtask in input
/// order. When nothing is ready (a cycle), the highest-priority remaining
/// subtask is forced through regardless of unmet dependencies. Ordering
/// therefore always terminates, at the cost of running that subtask before
/// one of its declared dependencies.
pub struct DependencyResolver;

impl DependencyResolver {
    /// Check that ids are unique and every dependency names a known subtask.
    pub fn validate(subtasks: &[SubTask]) -> ConductorResult<()> {
        let mut ids: HashSet<&str> = HashSet::with_capacity(subtasks.len());
        for task in subtasks {
            if !ids.insert(task.id.as_str()) {
                return Err(ConductorError::Config(format!(
                    "duplicate subtask id '{}'",
                    task.id
                )));
            }
        }

        for task in subtasks {
            if let Some(missing) = task
                .dependencies
                .iter()
                .find(|dep| !ids.contains(dep.as_str()))
            {
                return Err(ConductorError::Config(format!(
                    "subtask '{}' depends on unknown subtask '{}'",
                    task.id, missing
                )));
            }
        }
        Ok(())
    }

    /// Produce an execution order honoring dependencies.
    pub fn order(subtasks: &[SubTask]) -> ConductorResult<Vec<&SubTask>> {
        Self::validate(subtasks)?;

        let mut remaining: Vec<&SubTask> = subtasks.iter().collect();
        let mut satisfied: HashSet<&str> = HashSet::with_capacity(subtasks.len());
        let mut ordered = Vec::with_capacity(subtasks.len());

        while !remaining.is_empty() {
            let idx = match highest_priority(&remaining, |t| t.is_ready(&satisfied)) {
                Some(idx) => idx,
                None => {
                    // Every remaining subtask is non-empty, so a candidate exists.
                    let idx = highest_priority(&remaining, |_| true).unwrap_or(0);
                    let forced = remaining[idx];
                    let unmet: Vec<&str> = forced
                        .dependencies
                        .iter()
                        .map(String::as_str)
                        .filter(|dep| !satisfied.contains(dep))
                        .collect();
                    warn!(
                        subtask = %forced.id,
                        unmet = ?unmet,
                        "Dependency cycle: forcing subtask ahead of unmet dependencies"
                    );
                    idx
                }
            };

            let task = remaining.remove(idx);
            satisfied.insert(task.id.as_str());
            ordered.push(task);
        }

        Ok(ordered)
    }
}

/// Index of the first subtask with maximal priority among those matching `eligible`.
fn highest_priority<F>(tasks: &[&SubTask], eligible: F) -> Option<usize>
where
    F: Fn(&SubTask) -> bool,
{
    let mut best: Option<usize> = None;
    for (idx, task) in tasks.iter().enumerate() {
        if !eligible(*task) {
            continue;
        }
        match best {
            Some(b) if tasks[b].priority >= task.priority => {}
            _ => best = Some(idx),
        }
    }
    best
}
