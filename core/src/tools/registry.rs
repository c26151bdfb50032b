use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::error::{ToolError, ToolResult};
use crate::llm::{ToolInvocation, ToolSpec};

/// The closed set of tools a research run can call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    WebSearch,
    WebFetch,
    NextBreed,
    BreedDetails,
    SaveBreedResearch,
    SaveChickenFact,
}

impl ToolKind {
    pub const ALL: [ToolKind; 6] = [
        ToolKind::WebSearch,
        ToolKind::WebFetch,
        ToolKind::NextBreed,
        ToolKind::BreedDetails,
        ToolKind::SaveBreedResearch,
        ToolKind::SaveChickenFact,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::WebSearch => "web_search",
            ToolKind::WebFetch => "web_fetch",
            ToolKind::NextBreed => "get_next_breed_to_research",
            ToolKind::BreedDetails => "get_breed_details",
            ToolKind::SaveBreedResearch => "save_breed_research",
            ToolKind::SaveChickenFact => "save_chicken_fact",
        }
    }

    pub fn from_name(name: &str) -> Option<ToolKind> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Completion tools end the model loop once they succeed
    pub fn is_completion(self) -> bool {
        matches!(self, ToolKind::SaveBreedResearch | ToolKind::SaveChickenFact)
    }

    pub fn description(self) -> &'static str {
        match self {
            ToolKind::WebSearch => {
                "Search the public web to find the latest information. Returns search results with titles, URLs, and content snippets."
            }
            ToolKind::WebFetch => {
                "Fetches the full content of a web page by URL and returns a concise summary with key facts. Use this to extract information from URLs found in web search results."
            }
            ToolKind::NextBreed => {
                "Retrieves the next chicken breed that needs research. Prioritizes breeds that have never been researched; otherwise selects the one with the oldest update timestamp. Returns the breed ID, name, last update time, and selection reason."
            }
            ToolKind::BreedDetails => {
                "Fetches the current information for a specific chicken breed by ID, including origin, egg characteristics, temperament, description, and existing source URLs."
            }
            ToolKind::SaveBreedResearch => {
                "Saves the research findings for a chicken breed. Call this after researching the breed. Required: breedId, report, and at least one source URL. Optional verified fields: origin, eggColor, eggSize, temperament, description, numEggs."
            }
            ToolKind::SaveChickenFact => {
                "Saves a single interesting chicken fact together with the URL of the source that supports it."
            }
        }
    }

    /// JSON schema for the tool's arguments
    pub fn parameters(self) -> Value {
        match self {
            ToolKind::WebSearch => json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "The search query to find information on the web"},
                    "max_results": {"type": "integer", "minimum": 1, "maximum": 5, "description": "Optional: number of results to return (1-5)"}
                },
                "required": ["query"]
            }),
            ToolKind::WebFetch => json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "The URL to fetch and read in detail"}
                },
                "required": ["url"]
            }),
            ToolKind::NextBreed => json!({
                "type": "object",
                "properties": {
                    "fetch": {"type": "boolean", "description": "Set to true to get the next breed that needs research"}
                }
            }),
            ToolKind::BreedDetails => json!({
                "type": "object",
                "properties": {
                    "breedId": {"type": "integer", "description": "The ID of the breed to fetch details for"}
                },
                "required": ["breedId"]
            }),
            ToolKind::SaveBreedResearch => json!({
                "type": "object",
                "properties": {
                    "breedId": {"type": "integer", "description": "The breed ID being researched"},
                    "report": {"type": "string", "description": "A 2-4 paragraph report about what makes this breed unique"},
                    "description": {"type": ["string", "null"], "description": "A compelling 2-3 sentence description without URLs"},
                    "origin": {"type": ["string", "null"], "description": "Verified country or region of origin, or null"},
                    "eggColor": {"type": ["string", "null"], "description": "Verified egg color, or null"},
                    "eggSize": {"type": ["string", "null"], "description": "Small, Medium, Large, or Extra-Large, or null"},
                    "temperament": {"type": ["string", "null"], "description": "Brief temperament description, or null"},
                    "numEggs": {"type": ["integer", "null"], "description": "Verified average annual egg production, or null"},
                    "sources": {"type": "array", "items": {"type": "string"}, "description": "Source URLs used to verify the information"}
                },
                "required": ["breedId", "report", "sources"]
            }),
            ToolKind::SaveChickenFact => json!({
                "type": "object",
                "properties": {
                    "fact": {"type": "string", "description": "A clear, interesting statement about chickens"},
                    "sourceUrl": {"type": "string", "description": "The primary URL that supports this fact"}
                },
                "required": ["fact", "sourceUrl"]
            }),
        }
    }

    pub fn spec(self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Arguments of `save_breed_research`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BreedResearchArgs {
    pub breed_id: i64,
    pub report: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub egg_color: Option<String>,
    #[serde(default)]
    pub egg_size: Option<String>,
    #[serde(default)]
    pub temperament: Option<String>,
    #[serde(default)]
    pub num_eggs: Option<i64>,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Arguments of `save_chicken_fact`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FactArgs {
    pub fact: String,
    pub source_url: String,
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default, alias = "maxResults")]
    max_results: Option<u32>,
}

#[derive(Deserialize)]
struct FetchArgs {
    url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BreedIdArgs {
    breed_id: i64,
}

/// A typed tool call, ready for dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    WebSearch { query: String, max_results: Option<u32> },
    WebFetch { url: String },
    NextBreed,
    BreedDetails { breed_id: i64 },
    SaveBreedResearch(BreedResearchArgs),
    SaveChickenFact(FactArgs),
}

impl ToolRequest {
    /// Parse a model tool call, rejecting names outside `allowed`
    pub fn parse(call: &ToolInvocation, allowed: &[ToolKind]) -> ToolResult<ToolRequest> {
        let kind = ToolKind::from_name(&call.name)
            .filter(|k| allowed.contains(k))
            .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;
        let args = call.arguments.clone();
        let request = match kind {
            ToolKind::WebSearch => {
                let a: SearchArgs = decode(kind, args)?;
                if a.query.trim().is_empty() {
                    return Err(ToolError::InvalidArguments("query must not be blank".into()));
                }
                ToolRequest::WebSearch {
                    query: a.query,
                    max_results: a.max_results,
                }
            }
            ToolKind::WebFetch => {
                let a: FetchArgs = decode(kind, args)?;
                if a.url.trim().is_empty() {
                    return Err(ToolError::InvalidArguments("url must not be blank".into()));
                }
                ToolRequest::WebFetch { url: a.url }
            }
            ToolKind::NextBreed => ToolRequest::NextBreed,
            ToolKind::BreedDetails => {
                let a: BreedIdArgs = decode(kind, args)?;
                ToolRequest::BreedDetails {
                    breed_id: a.breed_id,
                }
            }
            ToolKind::SaveBreedResearch => ToolRequest::SaveBreedResearch(decode(kind, args)?),
            ToolKind::SaveChickenFact => ToolRequest::SaveChickenFact(decode(kind, args)?),
        };
        Ok(request)
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            ToolRequest::WebSearch { .. } => ToolKind::WebSearch,
            ToolRequest::WebFetch { .. } => ToolKind::WebFetch,
            ToolRequest::NextBreed => ToolKind::NextBreed,
            ToolRequest::BreedDetails { .. } => ToolKind::BreedDetails,
            ToolRequest::SaveBreedResearch(_) => ToolKind::SaveBreedResearch,
            ToolRequest::SaveChickenFact(_) => ToolKind::SaveChickenFact,
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(kind: ToolKind, args: Value) -> ToolResult<T> {
    serde_json::from_value(args)
        .map_err(|e| ToolError::InvalidArguments(format!("{}: {e}", kind.name())))
}
