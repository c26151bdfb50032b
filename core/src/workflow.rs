//! Workflow definitions: prompts, tool sets, budgets and answer shapes.

use crate::llm::{ToolSpec, Turn};
use crate::tools::ToolKind;
use crate::validate::{AnswerShape, AnswerValidator};

pub const BREED_SENTINEL: &str = "success";
pub const FACT_SENTINEL: &str = "fact";

const BREED_SYSTEM_PROMPT: &str = "\
You are a chicken breed specialist who writes compelling, accurate breed descriptions for a chicken encyclopedia.

## Workflow

1. Call `get_next_breed_to_research` to get the breed you should research
2. Call `get_breed_details` to see what information we currently have
3. Use `web_search` and `web_fetch` to research the breed
4. Call `save_breed_research` with your findings

## Research Focus

Look for origin and history, egg production (color, size, annual quantity), temperament, and what makes the breed unique.

## Writing

`report` is a 2-4 paragraph synthesis of your research. `description`, if you provide one, is 2-3 engaging sentences \
without URLs or citations. Prioritize authoritative sources such as breed registries and university extensions. \
Only include facts you can verify; use null for optional fields you cannot verify. Always include at least one source URL.";

const BREED_USER_PROMPT: &str = "\
Research the next chicken breed and write a compelling report for our database. \
Start by calling get_next_breed_to_research, then gather information and save your findings.";

const BREED_FORCING: &str = "\
You have used all of your tool calls. Tool calling is now disabled: do not call any tool. \
Synthesize your research now and respond with ONLY a JSON object of this exact shape:
{\"success\": true, \"breedId\": <id of the breed you researched>, \"breedName\": \"<name>\", \
\"report\": \"<2-4 paragraph report>\", \"description\": <string or null>, \"origin\": <string or null>, \
\"eggColor\": <string or null>, \"eggSize\": <string or null>, \"temperament\": <string or null>, \
\"numEggs\": <integer or null>, \"sources\": [\"<url>\", ...]}";

const BREED_REPAIR: &str = "\
Your previous answer was not in the required format. Reply again with ONLY the JSON object \
{\"success\": true, \"breedId\": ..., \"breedName\": ..., \"report\": ..., \"sources\": [...]} \
plus any verified optional fields. No prose, no tool calls.";

const FACT_SYSTEM_PROMPT: &str = "\
You are an expert chicken fact researcher.

- When you need new information, call the web_search tool.
- Optionally use web_fetch to pull supporting content for specific URLs.
- After you have information from good sources, STOP calling research tools and call save_chicken_fact \
with a single fact and the URL of the source you actually used.
- If you cannot call tools, answer with a SHORT markdown bullet list where each bullet holds a fact and its source URL.";

const FACT_FORCING: &str = "\
You have used all of your tool calls. Tool calling is now disabled: do not call any tool. \
Synthesize your research into a single, compelling chicken fact. Respond with ONLY a JSON object \
{\"fact\": \"<the fact>\", \"sourceUrl\": \"<primary source URL>\"} or a short markdown bullet \
list where each bullet contains the fact and its source URL.";

const FACT_REPAIR: &str = "\
Your previous answer was not in the required format. Reply again as a markdown bullet list where \
each bullet holds one chicken fact and the source URL you used, or as the JSON object \
{\"fact\": \"...\", \"sourceUrl\": \"...\"}. No tool calls.";

/// Everything a run of one research workflow needs besides its collaborators
#[derive(Debug, Clone)]
pub struct Workflow {
    pub name: &'static str,
    pub max_tool_calls: u32,
    pub system_prompt: String,
    pub user_prompt: String,
    pub tools: Vec<ToolKind>,
    /// System-authored turn injected when the budget is exceeded
    pub forcing_instruction: String,
    pub validator: AnswerValidator,
    /// Key locating the structured payload in the final text
    pub sentinel: &'static str,
    /// Summarizer focus for search results and fetched pages
    pub search_focus: &'static str,
    pub fetch_focus: &'static str,
}

impl Workflow {
    pub fn breed_research(max_tool_calls: u32) -> Self {
        Self {
            name: "breed_research",
            max_tool_calls,
            system_prompt: BREED_SYSTEM_PROMPT.to_string(),
            user_prompt: BREED_USER_PROMPT.to_string(),
            tools: vec![
                ToolKind::NextBreed,
                ToolKind::BreedDetails,
                ToolKind::WebSearch,
                ToolKind::WebFetch,
                ToolKind::SaveBreedResearch,
            ],
            forcing_instruction: BREED_FORCING.to_string(),
            validator: AnswerValidator::new(AnswerShape::json_with(BREED_SENTINEL), BREED_REPAIR),
            sentinel: BREED_SENTINEL,
            search_focus: "breed-specific facts, characteristics, history, temperament, and egg production details",
            fetch_focus: "breed-specific characteristics, history, temperament, egg production, and unique traits",
        }
    }

    pub fn chicken_facts(max_tool_calls: u32, prompt: impl Into<String>) -> Self {
        Self {
            name: "chicken_facts",
            max_tool_calls,
            system_prompt: FACT_SYSTEM_PROMPT.to_string(),
            user_prompt: prompt.into(),
            tools: vec![
                ToolKind::WebSearch,
                ToolKind::WebFetch,
                ToolKind::SaveChickenFact,
            ],
            forcing_instruction: FACT_FORCING.to_string(),
            validator: AnswerValidator::new(
                AnswerShape::AnyOf(vec![
                    AnswerShape::json_with(FACT_SENTINEL),
                    AnswerShape::BulletedWithUrl,
                ]),
                FACT_REPAIR,
            ),
            sentinel: FACT_SENTINEL,
            search_focus: "interesting, fun, or surprising facts",
            fetch_focus: "interesting, fun, or surprising facts, trivia, quirky behaviors, amusing stories, and fascinating tidbits",
        }
    }

    /// Append extra guidance (e.g. duplicate feedback) to the user prompt
    pub fn with_feedback(mut self, feedback: &str) -> Self {
        self.user_prompt = format!("{}\n\n{}", self.user_prompt, feedback);
        self
    }

    pub fn tool_specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|k| k.spec()).collect()
    }

    /// The system and user turns every run starts from
    pub fn opening_turns(&self) -> Vec<Turn> {
        vec![
            Turn::system(self.system_prompt.clone()),
            Turn::user(self.user_prompt.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fact_workflow_excludes_breed_tools() {
        let wf = Workflow::chicken_facts(4, "Find a chicken fact.");
        assert_eq!(wf.max_tool_calls, 4);
        assert!(!wf.tools.contains(&ToolKind::NextBreed));
        assert_eq!(wf.tool_specs().len(), 3);
    }

    #[test]
    fn feedback_extends_the_user_prompt() {
        let wf = Workflow::chicken_facts(4, "Find a chicken fact.").with_feedback("Pick another topic.");
        let turns = wf.opening_turns();
        assert_eq!(turns.len(), 2);
        assert!(turns[1].content.starts_with("Find a chicken fact."));
        assert!(turns[1].content.ends_with("Pick another topic."));
    }

    #[test]
    fn breed_answers_must_carry_the_success_key() {
        let wf = Workflow::breed_research(8);
        assert!(wf
            .validator
            .shape()
            .matches(r#"Done: {"success": true, "breedId": 5, "report": "r", "sources": ["https://a"]}"#));
        assert!(!wf.validator.shape().matches("- Silkies are fluffy https://a"));
    }
}
