//! Budget-bounded conversation engine
//!
//! One engine drives one run: model turns and tool turns alternate until the
//! model answers, a completion tool accepts its payload, or the tool-call
//! budget is exceeded and a tool-free final turn is forced. The answer is
//! then validated and repaired at most once. `run` consumes the engine, so an
//! instance (and its budget) can never be reused for a second run.

mod machine;

pub use machine::{step, BudgetDecision, Event, State, ToolCallBudget};

use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::llm::{ChatModel, ModelReply, ToolInvocation, ToolSpec, Turn};
use crate::tools::{ToolRequest, Toolbox};
use crate::workflow::Workflow;
use crate::Result;

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Final answer text, possibly blank or off-shape
    pub text: String,
    pub transcript: Vec<Turn>,
    /// Tool-call decision points counted against the budget
    pub tool_calls_requested: u32,
    /// Tool calls that reached `ExecutingTool`
    pub tool_calls_executed: u32,
    /// Whether the budget was exceeded and a final turn forced
    pub forced: bool,
    /// Whether the validator spent its repair turn
    pub repaired: bool,
}

pub struct ConversationEngine {
    model: Arc<dyn ChatModel>,
    toolbox: Toolbox,
    workflow: Workflow,
    specs: Vec<ToolSpec>,
    transcript: Vec<Turn>,
    budget: ToolCallBudget,
    executed: u32,
    forced: bool,
    repaired: bool,
}

impl ConversationEngine {
    pub fn new(model: Arc<dyn ChatModel>, toolbox: Toolbox, workflow: Workflow) -> Self {
        let specs = workflow.tool_specs();
        let budget = ToolCallBudget::new(workflow.max_tool_calls);
        Self {
            model,
            toolbox,
            workflow,
            specs,
            transcript: Vec::new(),
            budget,
            executed: 0,
            forced: false,
            repaired: false,
        }
    }

    /// Drive the run from `Start` to `Done`. Model and tool failures end the
    /// run with an error; nothing is retried.
    #[tracing::instrument(name = "engine_run", skip_all, fields(workflow = self.workflow.name, max_tool_calls = self.workflow.max_tool_calls))]
    pub async fn run(mut self) -> Result<RunSummary> {
        let mut state = State::Start;
        loop {
            let event = match &state {
                State::Start => {
                    self.transcript = self.workflow.opening_turns();
                    Event::Started
                }
                State::AwaitingModelTurn => self.request_turn().await?,
                State::ExecutingTool(call) => {
                    let call = call.clone();
                    self.execute(&call).await?
                }
                State::ForcingFinalTurn => {
                    let text = self.model.respond_without_tools(&self.transcript).await?;
                    self.transcript.push(Turn::assistant(text.clone()));
                    Event::ForcedReply(text)
                }
                State::ValidatingAnswer(candidate) => {
                    let settled = self
                        .workflow
                        .validator
                        .settle(self.model.as_ref(), &mut self.transcript, candidate.clone())
                        .await?;
                    self.repaired = settled.repaired;
                    Event::Settled(settled.text)
                }
                State::Done(text) => {
                    info!(
                        target: "engine",
                        requested = self.budget.used(),
                        executed = self.executed,
                        forced = self.forced,
                        repaired = self.repaired,
                        "Run finished"
                    );
                    return Ok(RunSummary {
                        text: text.clone(),
                        transcript: self.transcript,
                        tool_calls_requested: self.budget.used(),
                        tool_calls_executed: self.executed,
                        forced: self.forced,
                        repaired: self.repaired,
                    });
                }
            };

            let from = state.name();
            let pending_call = match &event {
                Event::ModelToolCall(call) => Some(call.clone()),
                _ => None,
            };
            let (next, budget) = step(state, event, self.budget)?;
            debug!(target: "engine", from, to = next.name(), used = budget.used(), "Transition");
            self.budget = budget;
            self.on_enter(&next, pending_call);
            state = next;
        }
    }

    async fn request_turn(&mut self) -> Result<Event> {
        match self.model.respond(&self.transcript, &self.specs).await? {
            ModelReply::Message(text) => {
                self.transcript.push(Turn::assistant(text.clone()));
                Ok(Event::ModelMessage(text))
            }
            ModelReply::ToolCall(mut call) => {
                if call.id.is_none() {
                    call.id = Some(format!("call_{}", self.budget.used() + 1));
                }
                Ok(Event::ModelToolCall(call))
            }
        }
    }

    /// Transcript bookkeeping for the state just entered
    fn on_enter(&mut self, state: &State, pending_call: Option<ToolInvocation>) {
        match state {
            State::ExecutingTool(call) => {
                self.executed += 1;
                info!(
                    target: "engine",
                    tool = %call.name,
                    used = self.budget.used(),
                    max = self.budget.max(),
                    will_execute = true,
                    "Tool call requested"
                );
                self.transcript.push(Turn::tool_request(call.clone()));
            }
            State::ForcingFinalTurn => {
                let tool = pending_call.map(|c| c.name).unwrap_or_default();
                info!(
                    target: "engine",
                    tool = %tool,
                    used = self.budget.used(),
                    max = self.budget.max(),
                    will_execute = false,
                    "Tool call requested"
                );
                warn!(
                    target: "engine",
                    used = self.budget.used(),
                    max = self.budget.max(),
                    "Tool call limit exceeded, forcing final answer"
                );
                self.forced = true;
                self.transcript
                    .push(Turn::system(self.workflow.forcing_instruction.clone()));
            }
            _ => {}
        }
    }

    async fn execute(&mut self, call: &ToolInvocation) -> Result<Event> {
        let parsed = ToolRequest::parse(call, &self.workflow.tools);
        let outcome = match parsed {
            Ok(request) => self.toolbox.execute(request).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(output) => {
                self.transcript
                    .push(Turn::tool_result(call.id.clone(), output.content));
                if output.completion.is_some() {
                    info!(target: "engine", tool = %call.name, "Completion tool accepted payload");
                }
                Ok(Event::ToolFinished {
                    completion: output.completion.map(|v| v.to_string()),
                })
            }
            Err(e) if e.is_recoverable() => {
                warn!(target: "engine", tool = %call.name, error = %e, "Tool call rejected; reporting to model");
                let body = json!({"error": e.to_string()}).to_string();
                self.transcript.push(Turn::tool_result(call.id.clone(), body));
                Ok(Event::ToolFinished { completion: None })
            }
            Err(e) => {
                error!(target: "engine", tool = %call.name, error = %e, "Tool execution failed; ending run");
                Err(e.into_run_error(&call.name))
            }
        }
    }
}
