//! Plain-text helpers shared by the file-backed adapters.

use std::sync::LazyLock;

use regex::Regex;

const STOP_WORDS: &[&str] = &[
	"the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "in", "on", "at", "to",
	"for", "of", "with", "by", "from", "as", "and", "or", "but", "not", "it", "its", "this", "that",
	"what", "which", "who", "whom", "how", "when", "where", "why", "can", "may", "shall", "will",
	"do", "does", "did", "has", "have", "had", "about", "under",
];
/// Per-keyword cap on counted body occurrences.
pub const MAX_HITS_PER_KEYWORD: usize = 10;

struct HtmlPatterns {
	blocks: Regex,
	tags: Regex,
	numeric_entities: Regex,
	whitespace: Regex,
}

static HTML: LazyLock<Option<HtmlPatterns>> = LazyLock::new(|| {
	Some(HtmlPatterns {
		blocks: Regex::new(
			r"(?is)<script[^>]*>.*?</script>|<style[^>]*>.*?</style>|<head[^>]*>.*?</head>",
		)
		.ok()?,
		tags: Regex::new(r"<[^>]+>").ok()?,
		numeric_entities: Regex::new(r"&#\d+;").ok()?,
		whitespace: Regex::new(r"\s+").ok()?,
	})
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
	pub text: String,
	/// Char offset of the chunk start in the source text.
	pub start: usize,
	pub end: usize,
}

/// Strips scripts, styles, tags and common entities, collapsing whitespace.
pub fn html_to_text(html: &str) -> String {
	let Some(p) = HTML.as_ref() else {
		return html.split_whitespace().collect::<Vec<_>>().join(" ");
	};
	let text = p.blocks.replace_all(html, " ");
	let text = p.tags.replace_all(&text, " ");
	let text = text
		.replace("&nbsp;", " ")
		.replace("&amp;", "&")
		.replace("&lt;", "<")
		.replace("&gt;", ">")
		.replace("&quot;", "\"");
	let text = p.numeric_entities.replace_all(&text, " ");

	p.whitespace.replace_all(&text, " ").trim().to_string()
}

/// Lowercased search terms longer than two chars, minus stop words, in query order.
pub fn keywords(query: &str) -> Vec<String> {
	let mut out: Vec<String> = Vec::new();

	for word in query.split_whitespace() {
		let word = word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();

		if word.chars().count() <= 2 || STOP_WORDS.contains(&word.as_str()) {
			continue;
		}
		if !out.contains(&word) {
			out.push(word);
		}
	}

	out
}

/// Sum over keywords of non-overlapping occurrences, each capped at [`MAX_HITS_PER_KEYWORD`].
///
/// `haystack_lower` must already be lowercased.
pub fn keyword_hits(haystack_lower: &str, keywords: &[String]) -> u32 {
	keywords
		.iter()
		.map(|kw| haystack_lower.matches(kw.as_str()).take(MAX_HITS_PER_KEYWORD).count() as u32)
		.sum()
}

/// Window of `text` around the first keyword found, `before` bytes ahead and `after` bytes past it.
pub fn snippet(text: &str, keywords: &[String], before: usize, after: usize) -> Option<String> {
	let lower = text.to_ascii_lowercase();

	keywords.iter().find_map(|kw| {
		let idx = lower.find(kw.as_str())?;
		let start = floor_boundary(text, idx.saturating_sub(before));
		let end = ceil_boundary(text, (idx + after).min(text.len()));

		Some(text[start..end].trim().to_string())
	})
}

/// Splits text into overlapping windows of at most `size` chars, preferring sentence or line
/// breaks in the second half of a window.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<TextChunk> {
	let chars: Vec<char> = text.chars().collect();
	let len = chars.len();

	if len <= size || size == 0 {
		return vec![TextChunk { text: text.to_string(), start: 0, end: len }];
	}

	let mut chunks = Vec::new();
	let mut start = 0;

	while start < len {
		let end = (start + size).min(len);
		let mut chunk_end = end;

		if end < len {
			let floor = start + size / 2;
			let break_point = (floor + 1..end)
				.rev()
				.find(|&i| chars[i] == '.' || chars[i] == '\n');

			if let Some(bp) = break_point {
				chunk_end = bp + 1;
			}
		}

		let piece: String = chars[start..chunk_end].iter().collect();

		chunks.push(TextChunk { text: piece.trim().to_string(), start, end: chunk_end });

		if chunk_end >= len {
			break;
		}

		start = chunk_end.saturating_sub(overlap).max(start + 1);
	}

	chunks
}

pub fn truncate_chars(text: &str, max_chars: usize) -> String {
	match text.char_indices().nth(max_chars) {
		Some((idx, _)) => text[..idx].to_string(),
		None => text.to_string(),
	}
}

fn floor_boundary(text: &str, mut idx: usize) -> usize {
	while idx > 0 && !text.is_char_boundary(idx) {
		idx -= 1;
	}

	idx
}

fn ceil_boundary(text: &str, mut idx: usize) -> usize {
	while idx < text.len() && !text.is_char_boundary(idx) {
		idx += 1;
	}

	idx
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn html_is_flattened() {
		let html = "<html><head><title>x</title></head><body><script>var a;</script>\
			<p>Labor&nbsp;Code &amp; rules&#8212;here</p>\n\n<style>p{}</style></body></html>";

		assert_eq!(html_to_text(html), "Labor Code & rules here");
	}

	#[test]
	fn keywords_drop_stop_words_and_short_terms() {
		assert_eq!(
			keywords("What is the penalty for Estafa under the RPC? estafa"),
			vec!["penalty", "estafa", "rpc"]
		);
		assert!(keywords("is it an on").is_empty());
	}

	#[test]
	fn keyword_hits_are_capped() {
		let body = "estafa ".repeat(25);
		let kws = vec!["estafa".to_string(), "fraud".to_string()];

		assert_eq!(keyword_hits(&body, &kws), 10);
	}

	#[test]
	fn snippet_respects_char_boundaries() {
		let text = format!("{}Estafa is punished.{}", "é".repeat(150), "ñ".repeat(300));
		let snip = snippet(&text, &["estafa".to_string()], 201, 401).expect("snippet");

		assert!(snip.contains("Estafa is punished."));
		assert!(snippet(&text, &["murder".to_string()], 10, 10).is_none());
	}

	#[test]
	fn chunks_overlap_and_terminate() {
		let sentence = "The employer may terminate employment for just cause. ";
		let text = sentence.repeat(60);
		let chunks = chunk_text(&text, 800, 200);

		assert!(chunks.len() > 1);
		assert!(chunks.iter().all(|c| c.text.chars().count() <= 800));
		assert_eq!(chunks.last().map(|c| c.end), Some(text.chars().count()));

		for pair in chunks.windows(2) {
			assert!(pair[1].start < pair[0].end, "chunks must overlap");
			assert!(pair[1].start > pair[0].start, "chunks must advance");
		}
	}

	#[test]
	fn short_text_is_one_chunk() {
		let chunks = chunk_text("Short note.", 800, 200);

		assert_eq!(chunks.len(), 1);
		assert_eq!(chunks[0].text, "Short note.");
	}

	#[test]
	fn truncate_counts_chars() {
		assert_eq!(truncate_chars("ñandú", 3), "ñan");
		assert_eq!(truncate_chars("abc", 10), "abc");
	}
}
