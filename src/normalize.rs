//! Canonicalization of raw entity names, entity types, and relation labels.
//!
//! Every string written to the graph passes through here first, so that
//! "Payment Service", "payment-service" and "payment_service" all resolve
//! to the same canonical node. All three functions are pure and total.

/// Canonicalize a raw entity name.
///
/// Lower-cases, trims, and collapses every run of non-alphanumeric
/// characters into a single underscore. Leading and trailing separators
/// (including trailing punctuation) are stripped. May return an empty
/// string for input with no alphanumeric content; callers reject that.
pub fn canonicalize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Canonicalize a raw entity type against a fixed synonym table.
/// Unmapped or empty input collapses to "unknown".
pub fn canonicalize_type(raw: &str) -> String {
    let key = canonicalize_name(raw);
    let mapped = match key.as_str() {
        "svc" | "service" => "service",
        "api" => "api",
        "app" | "application" => "application",
        "db" | "database" | "datastore" => "database",
        "cache" | "redis" => "cache",
        "server" | "host" => "server",
        "component" | "module" => "component",
        "pipeline" => "pipeline",
        "job" => "job",
        "system" | "platform" => "system",
        "model" => "model",
        "feature" => "feature",
        _ => "unknown",
    };
    mapped.to_string()
}

/// Canonicalize a raw relation label against a fixed synonym table.
/// Unmapped non-empty labels pass through in canonical (snake_case) form;
/// empty input falls back to "related_to".
pub fn canonicalize_relation(raw: &str) -> String {
    let key = canonicalize_name(raw);
    if key.is_empty() {
        return "related_to".to_string();
    }
    match key.as_str() {
        "depends_on" | "dependson" | "depends" => "depends_on".to_string(),
        "uses" | "use" => "uses".to_string(),
        "calls" | "invokes" => "calls".to_string(),
        "connects_to" | "connects" | "connected_to" => "connects_to".to_string(),
        "reads_from" => "reads_from".to_string(),
        "writes_to" => "writes_to".to_string(),
        "publishes_to" => "publishes_to".to_string(),
        "consumes" => "consumes".to_string(),
        "queries" => "queries".to_string(),
        "triggers" => "triggers".to_string(),
        "loads" => "loads".to_string(),
        "hosted_on" => "hosted_on".to_string(),
        "runs" => "runs".to_string(),
        "provides" => "provides".to_string(),
        "owns" => "owns".to_string(),
        _ => key,
    }
}
