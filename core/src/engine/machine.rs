//! Pure transition function of the conversation state machine.

use crate::llm::ToolInvocation;
use crate::{Error, Result};

/// Per-run tool-call counter. Never shared; a new run starts from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolCallBudget {
    used: u32,
    max: u32,
}

/// What the budget allows for the tool call just counted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetDecision {
    Execute,
    Force,
}

impl ToolCallBudget {
    pub fn new(max: u32) -> Self {
        Self { used: 0, max }
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn reset(self) -> Self {
        Self::new(self.max)
    }

    /// Count one tool-call decision point, then decide. The count includes
    /// attempts that end up denied.
    pub fn attempt(self) -> (Self, BudgetDecision) {
        let next = Self {
            used: self.used.saturating_add(1),
            max: self.max,
        };
        let decision = if next.used <= next.max {
            BudgetDecision::Execute
        } else {
            BudgetDecision::Force
        };
        (next, decision)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum State {
    Start,
    AwaitingModelTurn,
    ExecutingTool(ToolInvocation),
    ForcingFinalTurn,
    ValidatingAnswer(String),
    Done(String),
}

impl State {
    pub fn name(&self) -> &'static str {
        match self {
            State::Start => "start",
            State::AwaitingModelTurn => "awaiting_model_turn",
            State::ExecutingTool(_) => "executing_tool",
            State::ForcingFinalTurn => "forcing_final_turn",
            State::ValidatingAnswer(_) => "validating_answer",
            State::Done(_) => "done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, State::Done(_))
    }
}

/// What happened while the engine was in a state
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Opening turns appended
    Started,
    /// The model answered without requesting a tool
    ModelMessage(String),
    /// The model requested a tool
    ModelToolCall(ToolInvocation),
    /// A tool result was appended; `completion` is set when a completion tool accepted its payload
    ToolFinished { completion: Option<String> },
    /// Reply to the tool-free forcing turn
    ForcedReply(String),
    /// Validation (and any repair) finished
    Settled(String),
}

impl Event {
    fn name(&self) -> &'static str {
        match self {
            Event::Started => "started",
            Event::ModelMessage(_) => "model_message",
            Event::ModelToolCall(_) => "model_tool_call",
            Event::ToolFinished { .. } => "tool_finished",
            Event::ForcedReply(_) => "forced_reply",
            Event::Settled(_) => "settled",
        }
    }
}

/// Apply one event. Budget accounting happens here, strictly before any
/// tool runs, so a tool call past the cap can never reach `ExecutingTool`.
pub fn step(state: State, event: Event, budget: ToolCallBudget) -> Result<(State, ToolCallBudget)> {
    match (state, event) {
        (State::Start, Event::Started) => Ok((State::AwaitingModelTurn, budget.reset())),
        (State::AwaitingModelTurn, Event::ModelMessage(text)) => {
            Ok((State::ValidatingAnswer(text), budget))
        }
        (State::AwaitingModelTurn, Event::ModelToolCall(call)) => match budget.attempt() {
            (budget, BudgetDecision::Execute) => Ok((State::ExecutingTool(call), budget)),
            (budget, BudgetDecision::Force) => Ok((State::ForcingFinalTurn, budget)),
        },
        (State::ExecutingTool(_), Event::ToolFinished { completion: None }) => {
            Ok((State::AwaitingModelTurn, budget))
        }
        (State::ExecutingTool(_), Event::ToolFinished { completion: Some(payload) }) => {
            Ok((State::ValidatingAnswer(payload), budget))
        }
        (State::ForcingFinalTurn, Event::ForcedReply(text)) => {
            Ok((State::ValidatingAnswer(text), budget))
        }
        (State::ValidatingAnswer(_), Event::Settled(text)) => Ok((State::Done(text), budget)),
        (state, event) => Err(Error::InvalidTransition(format!(
            "{} cannot handle {}",
            state.name(),
            event.name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call() -> ToolInvocation {
        ToolInvocation {
            id: None,
            name: "web_search".into(),
            arguments: json!({"query": "hens"}),
        }
    }

    #[test]
    fn increments_before_branching() {
        let budget = ToolCallBudget::new(1);
        let (state, budget) =
            step(State::AwaitingModelTurn, Event::ModelToolCall(call()), budget).unwrap();
        assert!(matches!(state, State::ExecutingTool(_)));
        assert_eq!(budget.used(), 1);

        let (state, budget) =
            step(State::AwaitingModelTurn, Event::ModelToolCall(call()), budget).unwrap();
        assert_eq!(state, State::ForcingFinalTurn);
        assert_eq!(budget.used(), 2);
    }

    #[test]
    fn zero_budget_forces_immediately() {
        let (state, budget) = step(
            State::AwaitingModelTurn,
            Event::ModelToolCall(call()),
            ToolCallBudget::new(0),
        )
        .unwrap();
        assert_eq!(state, State::ForcingFinalTurn);
        assert_eq!(budget.used(), 1);
    }

    #[test]
    fn start_resets_budget() {
        let (used, _) = ToolCallBudget::new(4).attempt();
        let (state, budget) = step(State::Start, Event::Started, used).unwrap();
        assert_eq!(state, State::AwaitingModelTurn);
        assert_eq!(budget, ToolCallBudget::new(4));
    }

    #[test]
    fn completion_payload_goes_to_validation() {
        let (state, _) = step(
            State::ExecutingTool(call()),
            Event::ToolFinished {
                completion: Some("{\"fact\":\"x\"}".into()),
            },
            ToolCallBudget::new(4),
        )
        .unwrap();
        assert_eq!(state, State::ValidatingAnswer("{\"fact\":\"x\"}".into()));
    }

    #[test]
    fn forcing_state_rejects_tool_calls() {
        let err = step(
            State::ForcingFinalTurn,
            Event::ModelToolCall(call()),
            ToolCallBudget::new(4),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition(_)));
    }

    #[test]
    fn done_is_terminal() {
        let err = step(
            State::Done("x".into()),
            Event::ModelMessage("y".into()),
            ToolCallBudget::new(4),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition(_)));
        assert!(State::Done(String::new()).is_terminal());
    }
}
