use serde_json::{json, Value};
use tracing::{info, warn};

use super::registry::FactArgs;

/// Validate a fact submission and echo it back, with whether it was accepted
pub(crate) fn save_chicken_fact(args: FactArgs) -> (Value, bool) {
    let fact = args.fact.trim();
    let source_url = args.source_url.trim();
    if fact.is_empty() || source_url.is_empty() {
        warn!(target: "web_tools", "Rejected chicken fact with blank fact or source");
        return (
            json!({"success": false, "error": "fact and sourceUrl must both be non-blank"}),
            false,
        );
    }
    info!(target: "web_tools", chars = fact.len(), source = %source_url, "Saving chicken fact");
    (
        json!({"success": true, "fact": fact, "sourceUrl": source_url}),
        true,
    )
}
