use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::error::{ToolError, ToolResult};
use super::registry::BreedResearchArgs;
use crate::records::Breed;
use crate::store::BreedCatalog;

/// Why a breed was picked for research
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionReason {
    NeverUpdated,
    OldestUpdate,
}

impl SelectionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SelectionReason::NeverUpdated => "never_updated",
            SelectionReason::OldestUpdate => "oldest_update",
        }
    }
}

/// Uniformly random among never-researched breeds, otherwise the oldest `updated_at`
pub fn select_next_breed<'a, R: Rng + ?Sized>(
    breeds: &'a [Breed],
    rng: &mut R,
) -> Option<(&'a Breed, SelectionReason)> {
    let never: Vec<&Breed> = breeds.iter().filter(|b| b.updated_at.is_none()).collect();
    if let Some(pick) = never.choose(rng) {
        return Some((pick, SelectionReason::NeverUpdated));
    }
    breeds
        .iter()
        .filter_map(|b| b.updated_at.map(|at| (at, b)))
        .min_by_key(|(at, _)| *at)
        .map(|(_, b)| (b, SelectionReason::OldestUpdate))
}

fn catalog_error(e: crate::Error) -> ToolError {
    ToolError::ExecutionFailed(format!("breed catalog: {e}"))
}

pub(crate) async fn next_breed(catalog: &dyn BreedCatalog) -> ToolResult<Value> {
    info!(target: "web_tools", "Fetching next breed to research");
    let breeds = catalog.all_breeds().await.map_err(catalog_error)?;
    let picked = select_next_breed(&breeds, &mut rand::thread_rng())
        .map(|(b, reason)| (b.clone(), reason));
    let Some((breed, reason)) = picked else {
        warn!(target: "web_tools", "No breeds found in catalog");
        return Ok(json!({
            "breedId": -1,
            "breedName": "NO_BREEDS_FOUND",
            "lastUpdated": null,
            "reason": "no_breeds_available",
        }));
    };
    info!(target: "web_tools", breed = %breed.name, id = breed.id, reason = reason.as_str(), "Selected breed");
    Ok(json!({
        "breedId": breed.id,
        "breedName": breed.name,
        "lastUpdated": breed.updated_at.map(|at| at.to_rfc3339()),
        "reason": reason.as_str(),
    }))
}

pub(crate) async fn breed_details(catalog: &dyn BreedCatalog, breed_id: i64) -> ToolResult<Value> {
    let Some(breed) = catalog.breed(breed_id).await.map_err(catalog_error)? else {
        warn!(target: "web_tools", breed_id, "Breed not found");
        return Ok(json!({"error": format!("Breed not found with ID {breed_id}")}));
    };
    Ok(json!({
        "id": breed.id,
        "name": breed.name,
        "origin": breed.origin,
        "eggColor": breed.egg_color,
        "eggSize": breed.egg_size,
        "temperament": breed.temperament,
        "description": breed.description,
        "numEggs": breed.num_eggs,
        "currentSources": breed.sources,
    }))
}

/// Validate a research submission and echo it back.
///
/// Returns the echoed payload and whether it was accepted. Rejections carry
/// `"success": false` and an `error` the model can act on.
pub(crate) async fn save_breed_research(
    catalog: &dyn BreedCatalog,
    args: BreedResearchArgs,
) -> ToolResult<(Value, bool)> {
    info!(
        target: "web_tools",
        breed_id = args.breed_id,
        report_chars = args.report.len(),
        sources = args.sources.len(),
        "Saving breed research"
    );
    let rejected = |error: String| -> ToolResult<(Value, bool)> {
        warn!(target: "web_tools", breed_id = args.breed_id, %error, "Rejected breed research");
        Ok((
            json!({"success": false, "breedId": args.breed_id, "error": error}),
            false,
        ))
    };

    let Some(breed) = catalog.breed(args.breed_id).await.map_err(catalog_error)? else {
        return rejected(format!("Breed not found with ID {}", args.breed_id));
    };
    if args.report.trim().is_empty() {
        return rejected("report must not be blank".into());
    }
    let sources: Vec<String> = args
        .sources
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if sources.is_empty() {
        return rejected("at least one source URL is required".into());
    }

    let mut echo = Map::new();
    echo.insert("success".into(), json!(true));
    echo.insert("breedId".into(), json!(breed.id));
    echo.insert("breedName".into(), json!(breed.name));
    echo.insert("report".into(), json!(args.report));
    let optional = [
        ("description", args.description.map(Value::from)),
        ("origin", args.origin.map(Value::from)),
        ("eggColor", args.egg_color.map(Value::from)),
        ("eggSize", args.egg_size.map(Value::from)),
        ("temperament", args.temperament.map(Value::from)),
        ("numEggs", args.num_eggs.map(Value::from)),
    ];
    for (key, value) in optional {
        if let Some(v) = value {
            echo.insert(key.into(), v);
        }
    }
    echo.insert("sources".into(), json!(sources));
    Ok((Value::Object(echo), true))
}
