//! Turn loop state
//!
//! Tracks the bounded tool-calling loop of a single orchestration run.

/// State of the orchestration loop
#[derive(Debug, Clone)]
pub struct TurnState {
    /// Backend round-trips performed so far
    pub turn: usize,
    /// Maximum allowed round-trips
    pub max_turns: usize,
    /// Tools dispatched to the provider, in first-call order
    pub tools_used: Vec<String>,
    /// Structured tool calls the model requested, dispatched or not
    pub requested_calls: usize,
    /// Latest non-empty assistant text
    pub last_text: Option<String>,
    /// Final answer if the model produced a terminal reply
    pub final_answer: Option<String>,
}

impl TurnState {
    /// Create a new loop state; at least one turn is always allowed
    pub fn new(max_turns: usize) -> Self {
        Self {
            turn: 0,
            max_turns: max_turns.max(1),
            tools_used: Vec::new(),
            requested_calls: 0,
            last_text: None,
            final_answer: None,
        }
    }

    /// Check if the loop should continue
    pub fn should_continue(&self) -> bool {
        self.turn < self.max_turns && self.final_answer.is_none()
    }

    /// Increment the turn counter
    pub fn next_turn(&mut self) {
        self.turn += 1;
    }

    /// Remember assistant text as the best partial answer
    pub fn record_text(&mut self, content: &str) {
        if !content.trim().is_empty() {
            self.last_text = Some(content.to_string());
        }
    }

    /// Count tool calls carried by a reply
    pub fn record_requests(&mut self, count: usize) {
        self.requested_calls += count;
    }

    /// Whether the backend call just made was the last one allowed
    pub fn on_last_turn(&self) -> bool {
        self.turn >= self.max_turns
    }

    /// Note a tool dispatched to the provider
    pub fn record_tool(&mut self, name: &str) {
        if !self.tools_used.iter().any(|t| t == name) {
            self.tools_used.push(name.to_string());
        }
    }

    /// Whether the loop ran out of turns without a terminal reply
    pub fn hit_limit(&self) -> bool {
        self.final_answer.is_none() && self.turn >= self.max_turns
    }
}
