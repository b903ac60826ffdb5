//! Agentic loop: evidence sufficiency verdicts and gap-targeted follow-up selection.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;

use juris_domain::{RankedResult, SubQuery};

use crate::search::{prompt, ranking::Merger};

pub const EVALUATION_TEMPERATURE: f32 = 0.1;
pub const EVALUATION_MAX_TOKENS: u32 = 1024;

const EVIDENCE_EXCERPT_CHARS: usize = 400;
const EVALUATION_SYSTEM_PROMPT: &str = "You are a Philippine legal research evaluator. \
You judge whether retrieved evidence answers a legal question and output only a JSON object.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
	Planning,
	Retrieving,
	Evaluating,
	Synthesizing,
	Done,
}
impl LoopState {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Planning => "planning",
			Self::Retrieving => "retrieving",
			Self::Evaluating => "evaluating",
			Self::Synthesizing => "synthesizing",
			Self::Done => "done",
		}
	}

	pub fn can_enter(self, next: Self) -> bool {
		matches!(
			(self, next),
			(Self::Planning, Self::Retrieving)
				| (Self::Retrieving, Self::Evaluating)
				| (Self::Retrieving, Self::Synthesizing)
				| (Self::Evaluating, Self::Retrieving)
				| (Self::Evaluating, Self::Synthesizing)
				| (Self::Synthesizing, Self::Done)
		)
	}
}

/// Moves the loop to `next`, logging the transition.
pub fn advance(state: &mut LoopState, next: LoopState, trace_id: uuid::Uuid, round: u32) {
	if !state.can_enter(next) {
		tracing::warn!(
			%trace_id,
			from = state.as_str(),
			to = next.as_str(),
			round,
			"Unexpected search state transition."
		);
	} else {
		tracing::debug!(%trace_id, from = state.as_str(), to = next.as_str(), round, "Search state changed.");
	}

	*state = next;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EvaluationVerdict {
	pub sufficient: bool,
	pub gaps: Vec<String>,
	#[serde(alias = "nextQueries")]
	pub next_queries: Vec<String>,
	pub answer: Option<String>,
}

/// Counters the loop consults after each round.
#[derive(Debug, Clone, Copy)]
pub struct LoopBudget {
	pub round: u32,
	pub max_rounds: u32,
	pub issued: usize,
	pub max_sub_queries: usize,
	/// Documents the last round added to the accumulated set.
	pub added: usize,
}
impl LoopBudget {
	pub fn remaining(&self) -> usize {
		self.max_sub_queries.saturating_sub(self.issued)
	}

	/// Only rounds after the first end the loop by adding nothing.
	pub fn can_follow_up(&self) -> bool {
		self.round < self.max_rounds && self.remaining() > 0 && (self.round == 1 || self.added > 0)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
	Continue(Vec<SubQuery>),
	Synthesize { inline_answer: Option<String>, reason: &'static str },
}

pub fn decide(
	verdict: EvaluationVerdict,
	budget: &LoopBudget,
	issued: &[SubQuery],
	merger: &Merger,
	synthesize_inline: bool,
) -> Decision {
	if verdict.sufficient {
		let inline_answer = if synthesize_inline {
			verdict.answer.map(|answer| answer.trim().to_string()).filter(|answer| !answer.is_empty())
		} else {
			None
		};

		return Decision::Synthesize { inline_answer, reason: "sufficient" };
	}
	if !budget.can_follow_up() {
		return Decision::Synthesize { inline_answer: None, reason: "budget_exhausted" };
	}

	let follow_ups =
		select_follow_ups(verdict.next_queries, issued, merger, budget.remaining(), budget.round + 1);

	if follow_ups.is_empty() {
		Decision::Synthesize { inline_answer: None, reason: "no_new_queries" }
	} else {
		Decision::Continue(follow_ups)
	}
}

/// Drops candidates that repeat an issued sub-query or name an already retrieved document.
pub fn select_follow_ups(
	candidates: Vec<String>,
	issued: &[SubQuery],
	merger: &Merger,
	budget: usize,
	round: u32,
) -> Vec<SubQuery> {
	let mut seen: HashSet<String> =
		issued.iter().map(|sub_query| sub_query.text.trim().to_lowercase()).collect();
	let mut out = Vec::new();

	for candidate in candidates {
		if out.len() >= budget {
			break;
		}

		let text = candidate.trim();

		if text.is_empty() || merger.has_title(text) {
			continue;
		}
		if seen.insert(text.to_lowercase()) {
			out.push(SubQuery::new(text, round).with_focus("gap"));
		}
	}

	out
}

pub fn build_evaluation_messages(
	query: &str,
	evidence: &[RankedResult],
	issued: &[SubQuery],
	max_follow_ups: usize,
	synthesize_inline: bool,
) -> Vec<Value> {
	let evidence_text = if evidence.is_empty() {
		"(no documents retrieved yet)".to_string()
	} else {
		evidence
			.iter()
			.map(|result| {
				let excerpt = prompt::truncate_graphemes(
					result.excerpts.first().map(String::as_str).unwrap_or_default(),
					EVIDENCE_EXCERPT_CHARS,
				);

				format!("[{}] {}\n{}", result.rank, prompt::source_heading(result), excerpt)
			})
			.collect::<Vec<_>>()
			.join("\n\n")
	};
	let issued_text = issued
		.iter()
		.enumerate()
		.map(|(idx, sub_query)| format!("  {}. {}", idx + 1, sub_query.text))
		.collect::<Vec<_>>()
		.join("\n");
	let answer_rule = if synthesize_inline {
		"- When sufficient is true, put a complete cited answer in \"answer\", citing sources by index like [2]."
	} else {
		"- Always set \"answer\" to null."
	};
	let user_prompt = format!(
		"Question: {query}

Sub-queries already searched:
{issued_text}

Evidence retrieved so far:
{evidence_text}

Return JSON matching this exact schema:
{{\"sufficient\": true, \"gaps\": [\"string\"], \"next_queries\": [\"string\"], \"answer\": null}}

Rules:
- sufficient is true only if the evidence covers the governing law and controlling jurisprudence.
- gaps lists what is missing.
- next_queries holds at most {max_follow_ups} new searchable sub-queries that target the gaps. \
Never repeat a sub-query above and never ask for a document already listed.
{answer_rule}"
	);

	vec![
		serde_json::json!({ "role": "system", "content": EVALUATION_SYSTEM_PROMPT }),
		serde_json::json!({ "role": "user", "content": user_prompt }),
	]
}

/// Parses the first JSON object in the evaluator output.
pub fn parse_verdict(raw: &str) -> Option<EvaluationVerdict> {
	let raw = raw.trim();

	if let Ok(verdict) = serde_json::from_str::<EvaluationVerdict>(raw) {
		return Some(verdict);
	}

	for (start, _) in raw.match_indices('{') {
		let mut stream = serde_json::Deserializer::from_str(&raw[start..]).into_iter::<Value>();

		if let Some(Ok(value @ Value::Object(_))) = stream.next()
			&& let Ok(verdict) = serde_json::from_value(value)
		{
			return Some(verdict);
		}
	}

	None
}
