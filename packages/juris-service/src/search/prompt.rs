//! Citation-indexed synthesis context under a character budget.

use serde_json::Value;
use unicode_segmentation::UnicodeSegmentation;

use juris_config::ResponseStyle;
use juris_domain::{ChatMode, ChatTurn, RankedResult, SubQuery};

pub const SYNTHESIS_TEMPERATURE: f32 = 0.3;
pub const SYNTHESIS_MAX_TOKENS: u32 = 2048;
/// Prior conversation turns replayed to the synthesis call.
pub const HISTORY_TURNS: usize = 6;
pub const HISTORY_TURN_CHARS: usize = 1_500;

const MAX_LISTED_SUB_QUERIES: usize = 12;
const SUB_QUERY_LINE_CHARS: usize = 200;

const SOURCE_SEPARATOR: &str = "\n\n---\n\n";
const EXCERPT_JOINER: &str = "\n...\n";
const ELLIPSIS: &str = "…";
const NO_SOURCES: &str = "No specific documents were retrieved from the database. Use your knowledge of \
Philippine law (Revised Penal Code, Civil Code, Family Code, Rules of Court, Labor Code, Constitution, and \
established Supreme Court jurisprudence) and say clearly that no retrieved source supports the answer.";
const MANDATORY_RULES: &str = "MANDATORY RULES:
1. Always give a complete, helpful answer to the legal question. Never refuse to answer.
2. Support every claim drawn from a source with its index, e.g. [2]. Only cite indexes listed below.
3. If the sources do not directly address the question, rely on general knowledge of Philippine law and mark which parts do not come from the retrieved sources.
4. When citing Supreme Court decisions: case title, G.R. number, date, and key doctrine.
5. When citing laws or statutes: full title, number, and key provisions.
6. Structure the response with a short **Legal Context** answering the exact question, then **Legal Basis / Doctrine** and analysis under clear sub-headings.
7. Do NOT invent G.R. numbers or case names.
8. State when the user should consult a lawyer for case-specific advice.";
const CITATION_FORMAT: &str = "CITATION FORMAT:
Cite retrieved sources by index: [n]
When citing a law, wrap it: {{law: FULL TITLE}}
When citing jurisprudence, wrap it: {{case: CASE TITLE (Year)}}
Use > blockquote prefix when directly quoting legal provisions verbatim.";
const FOLLOW_UPS: &str = "FOLLOW-UP TOPICS:
At the end, include \"## Suggested Follow-Up Topics\" with 3 concise topic suggestions, each on its own line prefixed with \"- \".";

#[derive(Debug, Clone, PartialEq)]
pub struct Citation {
	/// 1-based index the answer uses to cite this result.
	pub index: u32,
	pub result: RankedResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromptContext {
	pub citations: Vec<Citation>,
	pub system: String,
}
impl PromptContext {
	/// System prompt, the most recent prior turns, then the question.
	pub fn messages(&self, query: &str, history: &[ChatTurn]) -> Vec<Value> {
		let recent = &history[history.len().saturating_sub(HISTORY_TURNS)..];
		let mut messages = Vec::with_capacity(recent.len() + 2);

		messages.push(serde_json::json!({ "role": "system", "content": self.system }));

		for turn in recent {
			messages.push(serde_json::json!({
				"role": turn.role.as_str(),
				"content": truncate_graphemes(&turn.content, HISTORY_TURN_CHARS),
			}));
		}

		messages.push(serde_json::json!({ "role": "user", "content": query }));

		messages
	}
}

#[derive(Debug, Clone, Copy)]
pub struct PromptOptions {
	pub style: ResponseStyle,
	pub chat_mode: Option<ChatMode>,
	/// Upper bound on the whole system prompt, in chars.
	pub budget_chars: usize,
	pub max_excerpt_chars: usize,
}

pub fn build(results: &[RankedResult], sub_queries: &[SubQuery], options: &PromptOptions) -> PromptContext {
	let mut blocks: Vec<String> = results
		.iter()
		.enumerate()
		.map(|(idx, result)| render_block(idx as u32 + 1, result, options.max_excerpt_chars))
		.collect();
	let mut system = render_system(&blocks, sub_queries, options);

	while system.chars().count() > options.budget_chars && blocks.pop().is_some() {
		system = render_system(&blocks, sub_queries, options);
	}

	let citations: Vec<Citation> = results
		.iter()
		.take(blocks.len())
		.enumerate()
		.map(|(idx, result)| Citation { index: idx as u32 + 1, result: result.clone() })
		.collect();

	if citations.len() < results.len() {
		tracing::debug!(
			kept = citations.len(),
			dropped = results.len() - citations.len(),
			budget_chars = options.budget_chars,
			"Dropped lowest-ranked sources to fit the context budget."
		);
	}

	PromptContext { citations, system }
}

pub fn style_instruction(style: ResponseStyle) -> &'static str {
	match style {
		ResponseStyle::StandardV2 =>
			"Provide a comprehensive, well-structured legal analysis. Include relevant citations for every legal claim. Use formal Philippine legal writing style with clear headings and structured sections.",
		ResponseStyle::Standard => "Provide a balanced legal analysis with citations.",
		ResponseStyle::Concise =>
			"Be extremely concise. Provide only the key legal points, citations, and conclusions in bullet form.",
		ResponseStyle::Professional =>
			"Provide detailed legal analysis suitable for a practising lawyer. Include risk assessment, practical implications, and strategic considerations. Cite specific provisions and case holdings with pinpoint references.",
		ResponseStyle::Educational =>
			"Explain legal concepts for law students. Define legal terms, explain the reasoning, and include learning points with illustrative examples.",
		ResponseStyle::SimpleEnglish =>
			"Explain in simple, everyday language. Avoid legal jargon. Use analogies and examples that a non-lawyer would easily understand.",
	}
}

pub fn chat_mode_instruction(mode: ChatMode) -> &'static str {
	match mode {
		ChatMode::Find =>
			"The user wants to FIND specific legal documents, cases, or statutes. Focus on listing the most relevant documents with their full citations and brief summaries.",
		ChatMode::Explain =>
			"The user wants a legal concept EXPLAINED. Use the format: Definition, Legal Basis, Jurisprudence, Practical Application.",
		ChatMode::Draft =>
			"The user wants help DRAFTING a legal document. Provide a well-structured draft or template with proper legal formatting, standard clauses, and citations to supporting law.",
		ChatMode::Digest =>
			"The user wants a DIGEST of a case or law. Provide: Title/Citation, Facts, Issues, Ruling, Ratio Decidendi, Dispositive Portion.",
		ChatMode::Analyze =>
			"The user wants IN-DEPTH ANALYSIS. Cover Issue Identification, Applicable Law, Jurisprudential Development, Analysis, Conclusion, and Recommendations.",
	}
}

/// `Title (Number), Date` with the optional parts omitted.
pub fn source_heading(result: &RankedResult) -> String {
	let mut heading = result.hit.title.clone();

	if let Some(number) = result.hit.number.as_deref().filter(|number| !number.is_empty()) {
		heading.push_str(&format!(" ({number})"));
	}
	if let Some(date) = result.hit.date.as_deref().filter(|date| !date.is_empty()) {
		heading.push_str(&format!(", {date}"));
	}

	heading
}

/// Keeps at most `max` grapheme clusters, marking the cut with an ellipsis.
pub fn truncate_graphemes(text: &str, max: usize) -> String {
	let text = text.trim();

	if text.graphemes(true).nth(max).is_none() {
		return text.to_string();
	}
	if max == 0 {
		return String::new();
	}

	let mut out: String = text.graphemes(true).take(max - 1).collect();

	out.push_str(ELLIPSIS);

	out
}

fn render_block(index: u32, result: &RankedResult, max_excerpt_chars: usize) -> String {
	let mut block = format!(
		"[{index}] {}\nSource: {} ({}/{})",
		source_heading(result),
		result.adapter,
		result.hit.category,
		result.hit.subcategory
	);
	let excerpt = truncate_graphemes(&result.excerpts.join(EXCERPT_JOINER), max_excerpt_chars);

	if !excerpt.is_empty() {
		block.push_str("\nExcerpt:\n");
		block.push_str(&excerpt);
	}

	block
}

fn render_system(blocks: &[String], sub_queries: &[SubQuery], options: &PromptOptions) -> String {
	let mut system = String::from("You are an expert Philippine legal research assistant.\n\n");

	system.push_str(style_instruction(options.style));
	system.push('\n');

	if let Some(mode) = options.chat_mode {
		system.push_str(chat_mode_instruction(mode));
		system.push('\n');
	}

	system.push_str("\nRESEARCH CONTEXT:\nThe question was researched with these sub-queries:\n");

	for (idx, sub_query) in sub_queries.iter().take(MAX_LISTED_SUB_QUERIES).enumerate() {
		system.push_str(&format!(
			"  {}. {}\n",
			idx + 1,
			truncate_graphemes(&sub_query.text, SUB_QUERY_LINE_CHARS)
		));
	}

	if sub_queries.len() > MAX_LISTED_SUB_QUERIES {
		system.push_str(&format!("  ... and {} more\n", sub_queries.len() - MAX_LISTED_SUB_QUERIES));
	}

	for section in [MANDATORY_RULES, CITATION_FORMAT, FOLLOW_UPS] {
		system.push('\n');
		system.push_str(section);
		system.push('\n');
	}

	system.push_str(&format!("\nRETRIEVED SOURCES ({} documents):\n", blocks.len()));

	if blocks.is_empty() {
		system.push_str(NO_SOURCES);
	} else {
		system.push_str(&blocks.join(SOURCE_SEPARATOR));
	}

	system.push_str("\n\nProvide your legal analysis now.");

	system
}
