//! Human-readable rendering of a path's nodes and relation labels.

use crate::error::{GraphSightError, Result};

/// Format a path as `"{n0} -[{r0}]-> {n1} -[{r1}]-> ... {nk}"`.
///
/// Requires `relations.len() == names.len() - 1`; a mismatch means the
/// caller assembled the path wrong and is reported as an invariant error,
/// never triggered by correctly constructed traversal output.
pub fn explain_path(names: &[String], relations: &[String]) -> Result<String> {
    if names.is_empty() || relations.len() + 1 != names.len() {
        return Err(GraphSightError::Invariant(format!(
            "explanation requires {} relations for {} nodes, got {}",
            names.len().saturating_sub(1),
            names.len(),
            relations.len()
        )));
    }

    let mut out = String::with_capacity(names.len() * 16);
    out.push_str(&names[0]);
    for (name, relation) in names[1..].iter().zip(relations) {
        out.push_str(" -[");
        out.push_str(relation);
        out.push_str("]-> ");
        out.push_str(name);
    }
    Ok(out)
}
