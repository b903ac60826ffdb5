use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use juris_domain::{ChatMode, ChatTurn, SubQuery};

use crate::search::prompt;

/// Most sub-queries a single decomposition call may contribute.
pub const MAX_DECOMPOSED_QUERIES: u32 = 5;
pub const DECOMPOSITION_TEMPERATURE: f32 = 0.2;
pub const DECOMPOSITION_MAX_TOKENS: u32 = 500;

const CONTEXT_TURNS: usize = 4;
const CONTEXT_TURN_CHARS: usize = 200;

const DECOMPOSITION_SYSTEM_PROMPT: &str = "You are a Philippine legal research query planner. \
You output only valid JSON arrays of strings.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
	pub sub_queries: Vec<SubQuery>,
	/// Whether decomposition contributed anything beyond the literal query.
	pub decomposed: bool,
}
impl Plan {
	pub fn literal(query: &str) -> Self {
		Self { sub_queries: vec![SubQuery::new(query.trim(), 1)], decomposed: false }
	}

	pub fn from_queries(queries: Vec<String>) -> Self {
		let decomposed = queries.len() > 1;
		let sub_queries = queries
			.into_iter()
			.enumerate()
			.map(|(idx, text)| {
				let sub_query = SubQuery::new(text, 1);

				if idx == 0 { sub_query.with_focus("original") } else { sub_query.with_focus("decomposed") }
			})
			.collect();

		Self { sub_queries, decomposed }
	}
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DecompositionPayload {
	pub queries: Vec<String>,
}

pub fn build_decomposition_messages(
	query: &str,
	chat_mode: Option<ChatMode>,
	history: &[ChatTurn],
	max_queries: u32,
) -> Vec<Value> {
	let mode_hint = chat_mode
		.map(|mode| format!("\nThe user is in \"{}\" mode.", mode.as_str()))
		.unwrap_or_default();
	let conversation = conversation_context(history);
	let user_prompt = format!(
		"Decompose the legal question into 2-{max_queries} focused sub-queries that together cover \
its full scope. Each sub-query should target a specific legal concept, statute, case, or doctrine.

Rules:
- Output ONLY a JSON array of strings. No other text.
- Each sub-query must be specific and searchable against a Philippine legal database.
- Cover relevant statutes, Supreme Court jurisprudence, key doctrines, and procedural or practical application.
- If the question is already simple and narrow, return it as a single-element array.
- Maximum {max_queries} sub-queries.{mode_hint}{conversation}

Question: {query}

Output:"
	);

	vec![
		serde_json::json!({ "role": "system", "content": DECOMPOSITION_SYSTEM_PROMPT }),
		serde_json::json!({ "role": "user", "content": user_prompt }),
	]
}

fn conversation_context(history: &[ChatTurn]) -> String {
	let recent = &history[history.len().saturating_sub(CONTEXT_TURNS)..];

	if recent.is_empty() {
		return String::new();
	}

	let mut context = String::from("\n\nConversation context:");

	for turn in recent {
		context.push_str(&format!(
			"\n{}: {}",
			turn.role.as_str(),
			prompt::truncate_graphemes(&turn.content, CONTEXT_TURN_CHARS)
		));
	}

	context
}

/// Accepts a bare JSON array, `{"queries": [...]}`, or prose wrapping the first JSON array.
pub fn parse_decomposition(raw: &str) -> Option<Vec<String>> {
	let raw = raw.trim();

	if let Ok(value) = serde_json::from_str::<Value>(raw)
		&& let Some(queries) = queries_from_value(&value)
	{
		return Some(queries);
	}

	for (start, _) in raw.match_indices('[') {
		let mut stream = serde_json::Deserializer::from_str(&raw[start..]).into_iter::<Value>();

		if let Some(Ok(value)) = stream.next()
			&& let Some(queries) = queries_from_value(&value)
		{
			return Some(queries);
		}
	}

	None
}

fn queries_from_value(value: &Value) -> Option<Vec<String>> {
	let items = match value {
		Value::Array(items) => items,
		Value::Object(map) => map.get("queries")?.as_array()?,
		_ => return None,
	};
	let queries: Vec<String> =
		items.iter().filter_map(|item| item.as_str()).map(str::to_string).collect();

	if queries.is_empty() { None } else { Some(queries) }
}

/// Original query first, then case-insensitive distinct non-blank entries, capped at `max_queries`.
pub fn normalize_queries(queries: Vec<String>, original: &str, max_queries: u32) -> Vec<String> {
	let mut out = Vec::new();
	let mut seen = HashSet::new();

	push_query(&mut out, &mut seen, original);

	for query in queries {
		if out.len() >= max_queries as usize {
			break;
		}

		push_query(&mut out, &mut seen, &query);
	}

	out.truncate(max_queries.max(1) as usize);

	out
}

pub fn push_query(out: &mut Vec<String>, seen: &mut HashSet<String>, value: &str) {
	let trimmed = value.trim();

	if trimmed.is_empty() {
		return;
	}

	let key = trimmed.to_lowercase();

	if seen.insert(key) {
		out.push(trimmed.to_string());
	}
}
