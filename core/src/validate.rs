//! Final-answer validation with a single repair turn.

use tracing::{info, warn};

use crate::extract::extract_object;
use crate::llm::{ChatModel, Turn};
use crate::Result;

/// Required shape of a workflow's final answer
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerShape {
    /// At least one list-marker line and at least one URL
    BulletedWithUrl,
    /// A JSON object, possibly wrapped in prose, carrying the sentinel key
    JsonObject { sentinel: String },
    /// Accepted if any of the inner shapes holds
    AnyOf(Vec<AnswerShape>),
}

impl AnswerShape {
    pub fn json_with(sentinel: impl Into<String>) -> Self {
        AnswerShape::JsonObject {
            sentinel: sentinel.into(),
        }
    }

    /// Evaluate the predicate on the trimmed text
    pub fn matches(&self, text: &str) -> bool {
        let text = text.trim();
        match self {
            AnswerShape::BulletedWithUrl => has_bullet_line(text) && contains_url(text),
            AnswerShape::JsonObject { sentinel } => extract_object(text, sentinel).is_some(),
            AnswerShape::AnyOf(shapes) => shapes.iter().any(|s| s.matches(text)),
        }
    }
}

/// True if a line starts with `-`, `*`, `•` or `N.`
pub fn is_bullet_line(line: &str) -> bool {
    let line = line.trim_start();
    if line.starts_with("- ") || line.starts_with("* ") || line.starts_with('•') {
        return true;
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && line[digits..].starts_with(". ")
}

fn has_bullet_line(text: &str) -> bool {
    text.lines().any(is_bullet_line)
}

/// First `http://` or `https://` token in `text`, without trailing punctuation
pub fn first_url(text: &str) -> Option<&str> {
    let start = match (text.find("https://"), text.find("http://")) {
        (Some(a), Some(b)) => a.min(b),
        (a, b) => a.or(b)?,
    };
    let rest = &text[start..];
    let end = rest
        .find(|c: char| c.is_whitespace() || matches!(c, ')' | ']' | '>' | '"' | '\''))
        .unwrap_or(rest.len());
    Some(rest[..end].trim_end_matches(['.', ',', ';', ':']))
}

fn contains_url(text: &str) -> bool {
    first_url(text).is_some_and(|u| {
        let scheme = if u.starts_with("https://") { "https://" } else { "http://" };
        u.len() > scheme.len()
    })
}

/// Transient outcome of a shape check
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accepted,
    Rejected { repair_prompt: String },
}

/// Final text after validation, and whether a repair turn was spent
#[derive(Debug, Clone, PartialEq)]
pub struct Settled {
    pub text: String,
    pub repaired: bool,
}

/// Checks a candidate answer against a shape and repairs it at most once
#[derive(Debug, Clone)]
pub struct AnswerValidator {
    shape: AnswerShape,
    repair_instruction: String,
}

impl AnswerValidator {
    pub fn new(shape: AnswerShape, repair_instruction: impl Into<String>) -> Self {
        Self {
            shape,
            repair_instruction: repair_instruction.into(),
        }
    }

    pub fn shape(&self) -> &AnswerShape {
        &self.shape
    }

    pub fn judge(&self, candidate: &str) -> Verdict {
        if self.shape.matches(candidate) {
            Verdict::Accepted
        } else {
            Verdict::Rejected {
                repair_prompt: self.repair_instruction.clone(),
            }
        }
    }

    /// Accept the candidate, or issue exactly one tool-free repair turn and
    /// return its reply as final whatever its shape.
    pub async fn settle(
        &self,
        model: &dyn ChatModel,
        transcript: &mut Vec<Turn>,
        candidate: String,
    ) -> Result<Settled> {
        match self.judge(&candidate) {
            Verdict::Accepted => {
                info!(target: "validator", chars = candidate.len(), "Final answer accepted");
                Ok(Settled {
                    text: candidate,
                    repaired: false,
                })
            }
            Verdict::Rejected { repair_prompt } => {
                warn!(target: "validator", chars = candidate.len(), "Final answer rejected, requesting one repair turn");
                transcript.push(Turn::user(repair_prompt));
                let repaired = model.respond_without_tools(transcript).await?;
                transcript.push(Turn::assistant(repaired.clone()));
                if !self.shape.matches(&repaired) {
                    warn!(target: "validator", "Repaired answer still off-shape; accepting as final");
                }
                Ok(Settled {
                    text: repaired,
                    repaired: true,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bullet_and_url_both_required() {
        let shape = AnswerShape::BulletedWithUrl;
        assert!(shape.matches("- Hens dream (https://example.com/dreams)"));
        assert!(shape.matches("Facts:\n1. Hens dream\nsource: https://example.com"));
        assert!(!shape.matches("Chickens are great"));
        assert!(!shape.matches("- Chickens are great"));
        assert!(!shape.matches("See https://example.com"));
    }

    #[test]
    fn url_token_is_trimmed() {
        assert_eq!(
            first_url("read (https://example.com/a)."),
            Some("https://example.com/a")
        );
        assert_eq!(first_url("no link here"), None);
    }

    #[test]
    fn json_shape_needs_the_sentinel() {
        let shape = AnswerShape::json_with("fact");
        assert!(shape.matches(r#"Saved: {"fact": "Hens purr", "sourceUrl": "https://a"}"#));
        assert!(!shape.matches(r#"{"success": true}"#));
    }

    #[test]
    fn short_http_links_count_as_urls() {
        let shape = AnswerShape::BulletedWithUrl;
        assert!(shape.matches("- Hens purr http://a.io"));
        assert!(!shape.matches("- Hens purr http://"));
        assert!(!shape.matches("- Hens purr https://"));
        assert_eq!(first_url("http://a.io then https://b.org"), Some("http://a.io"));
    }

    #[test]
    fn json_shape_finds_nested_payloads() {
        let breed = AnswerShape::json_with("success");
        assert!(breed.matches(r#"{"result": {"success": true, "breedId": 5}}"#));
        let fact = AnswerShape::json_with("fact");
        assert!(fact.matches(r#"[{"fact": "Hens purr", "sourceUrl": "https://a.org"}]"#));
    }

    #[test]
    fn any_of_accepts_either_shape() {
        let shape = AnswerShape::AnyOf(vec![
            AnswerShape::json_with("fact"),
            AnswerShape::BulletedWithUrl,
        ]);
        assert!(shape.matches("* Roosters crow at dawn https://a.org/x"));
        assert!(shape.matches(r#"{"fact":"x","sourceUrl":"y"}"#));
        assert!(!shape.matches("nothing useful"));
    }

    #[test]
    fn rejection_carries_the_repair_instruction() {
        let v = AnswerValidator::new(AnswerShape::BulletedWithUrl, "Use bullets with URLs.");
        assert_eq!(
            v.judge("Chickens are great"),
            Verdict::Rejected {
                repair_prompt: "Use bullets with URLs.".into()
            }
        );
        assert_eq!(v.judge("- a https://b.c"), Verdict::Accepted);
    }
}
