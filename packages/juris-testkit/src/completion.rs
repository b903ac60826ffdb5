use std::{sync::Mutex, time::Duration};

use color_eyre::eyre;
use serde_json::Value;

use juris_config::LlmProviderConfig;
use juris_domain::BoxFuture;
use juris_providers::{CompletionOptions, CompletionProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
	Decomposition,
	Evaluation,
	Synthesis,
}
impl CompletionKind {
	/// Classifies a call by its system prompt.
	pub fn of(messages: &[Value]) -> Self {
		let system = messages
			.first()
			.and_then(|message| message.get("content"))
			.and_then(Value::as_str)
			.unwrap_or_default();

		if system.contains("query planner") {
			Self::Decomposition
		} else if system.contains("evaluator") {
			Self::Evaluation
		} else {
			Self::Synthesis
		}
	}
}

#[derive(Debug, Clone)]
pub enum Reply {
	Text(String),
	Fail(String),
	/// An insufficient verdict with a follow-up query no earlier call produced.
	FreshFollowUps,
}

struct Call {
	kind: CompletionKind,
	messages: Vec<Value>,
}

pub struct ScriptedCompletion {
	decomposition: Reply,
	evaluation: Reply,
	synthesis: Reply,
	delay: Option<Duration>,
	calls: Mutex<Vec<Call>>,
}
impl ScriptedCompletion {
	/// Decomposition fails, evaluation reports sufficiency, synthesis returns a fixed answer.
	pub fn new() -> Self {
		Self {
			decomposition: Reply::Fail("decomposition not scripted".to_string()),
			evaluation: Reply::Text(r#"{"sufficient": true, "gaps": [], "next_queries": []}"#.to_string()),
			synthesis: Reply::Text("Scripted answer citing [1].".to_string()),
			delay: None,
			calls: Mutex::new(Vec::new()),
		}
	}

	pub fn decomposition(mut self, reply: Reply) -> Self {
		self.decomposition = reply;

		self
	}

	pub fn evaluation(mut self, reply: Reply) -> Self {
		self.evaluation = reply;

		self
	}

	pub fn synthesis(mut self, reply: Reply) -> Self {
		self.synthesis = reply;

		self
	}

	/// Sleeps before every reply, so callers observe a completion that is not ready at once.
	pub fn delayed(mut self, delay: Duration) -> Self {
		self.delay = Some(delay);

		self
	}

	pub fn calls(&self, kind: CompletionKind) -> usize {
		self.calls
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.iter()
			.filter(|call| call.kind == kind)
			.count()
	}

	pub fn last_messages(&self, kind: CompletionKind) -> Option<Vec<Value>> {
		self.calls
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.iter()
			.rev()
			.find(|call| call.kind == kind)
			.map(|call| call.messages.clone())
	}

	fn respond(&self, messages: &[Value]) -> color_eyre::Result<String> {
		let kind = CompletionKind::of(messages);
		let mut calls = self.calls.lock().unwrap_or_else(|err| err.into_inner());

		calls.push(Call { kind, messages: messages.to_vec() });

		let reply = match kind {
			CompletionKind::Decomposition => &self.decomposition,
			CompletionKind::Evaluation => &self.evaluation,
			CompletionKind::Synthesis => &self.synthesis,
		};

		match reply {
			Reply::Text(text) => Ok(text.clone()),
			Reply::Fail(message) => Err(eyre::eyre!("{message}")),
			Reply::FreshFollowUps => {
				let seq = calls.iter().filter(|call| call.kind == kind).count();

				Ok(serde_json::json!({
					"sufficient": false,
					"gaps": [format!("gap {seq}")],
					"next_queries": [format!("follow-up query {seq}")],
				})
				.to_string())
			},
		}
	}
}
impl Default for ScriptedCompletion {
	fn default() -> Self {
		Self::new()
	}
}
impl CompletionProvider for ScriptedCompletion {
	fn complete<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
		_options: CompletionOptions,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		let reply = self.respond(messages);
		let delay = self.delay;

		Box::pin(async move {
			if let Some(delay) = delay {
				tokio::time::sleep(delay).await;
			}

			reply
		})
	}
}
