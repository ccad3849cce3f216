//! Maps a user-supplied container hint to exactly one running container.
//!
//! Order: exact name / ID / service match, then unique substring of the name,
//! then (no hint) the only running container. Never guesses between two.

use crate::docker::ContainerQuery;
use crate::error::{DipError, DipResult};
use crate::model::{ContainerFilter, ContainerInfo, ContainerTarget};

/// Shortest ID prefix accepted as an exact match, as printed by `docker ps`.
const MIN_ID_PREFIX: usize = 12;

/// One read-only engine query, then pure selection.
pub async fn resolve_target(
    query: &dyn ContainerQuery,
    project: &str,
    hint: Option<&str>,
) -> DipResult<ContainerTarget> {
    let running = query.list(&ContainerFilter::running_in(project)).await?;
    let target = select_target(&running, hint)?;
    tracing::debug!(
        hint = ?hint,
        id = %target.resolved_id,
        name = %target.resolved_name,
        "resolved target"
    );
    Ok(target)
}

pub fn select_target(running: &[ContainerInfo], hint: Option<&str>) -> DipResult<ContainerTarget> {
    let Some(hint) = hint.filter(|h| !h.is_empty()) else {
        return pick_one(running.iter().collect(), None);
    };

    let exact: Vec<&ContainerInfo> = running.iter().filter(|c| is_exact(c, hint)).collect();
    if !exact.is_empty() {
        return pick_one(exact, Some(hint));
    }

    let partial: Vec<&ContainerInfo> = running
        .iter()
        .filter(|c| c.name.contains(hint))
        .collect();
    pick_one(partial, Some(hint))
}

fn is_exact(container: &ContainerInfo, hint: &str) -> bool {
    container.name == hint
        || container.id == hint
        || (hint.len() >= MIN_ID_PREFIX && container.id.starts_with(hint))
        || container.service.as_deref() == Some(hint)
}

fn pick_one(candidates: Vec<&ContainerInfo>, hint: Option<&str>) -> DipResult<ContainerTarget> {
    match candidates.as_slice() {
        [] => Err(DipError::NoTarget {
            hint: hint.map(str::to_string),
        }),
        [only] => Ok(ContainerTarget {
            raw_name: hint.map(str::to_string),
            resolved_id: only.id.clone(),
            resolved_name: only.name.clone(),
            service: only.service.clone(),
        }),
        many => {
            let mut names: Vec<String> = many.iter().map(|c| c.name.clone()).collect();
            names.sort();
            Err(DipError::AmbiguousTarget {
                hint: hint.unwrap_or("<none>").to_string(),
                candidates: names,
            })
        }
    }
}
