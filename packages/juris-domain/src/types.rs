use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubQuery {
	pub text: String,
	/// Round that issued this sub-query, starting at 1.
	pub round: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub focus: Option<String>,
}
impl SubQuery {
	pub fn new(text: impl Into<String>, round: u32) -> Self {
		Self { text: text.into(), round, focus: None }
	}

	pub fn with_focus(mut self, focus: impl Into<String>) -> Self {
		self.focus = Some(focus.into());

		self
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hit {
	pub id: String,
	pub title: String,
	pub category: String,
	pub subcategory: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub number: Option<String>,
	/// ISO-8601 date or bare year; compared lexicographically.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub date: Option<String>,
	/// Adapter-native score. Only the producing adapter knows its scale.
	pub score: f32,
	pub relevant_text: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DedupKey {
	pub adapter: String,
	pub document_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
	pub adapter: String,
	pub hit: Hit,
	/// Distinct excerpts gathered from every occurrence of this document.
	pub excerpts: Vec<String>,
	pub normalized_score: f32,
	/// 1-based position in the final ordering.
	pub rank: u32,
}
impl RankedResult {
	pub fn key(&self) -> DedupKey {
		DedupKey { adapter: self.adapter.clone(), document_id: self.hit.id.clone() }
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum ChatMode {
	Find,
	Explain,
	Draft,
	Digest,
	Analyze,
}
impl ChatMode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Find => "find",
			Self::Explain => "explain",
			Self::Draft => "draft",
			Self::Digest => "digest",
			Self::Analyze => "analyze",
		}
	}
}
impl FromStr for ChatMode {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		match raw.trim() {
			"find" => Ok(Self::Find),
			"explain" => Ok(Self::Explain),
			"draft" => Ok(Self::Draft),
			"digest" => Ok(Self::Digest),
			"analyze" => Ok(Self::Analyze),
			other => Err(Error::InvalidValue { message: format!("Unknown chat mode {other:?}.") }),
		}
	}
}
impl TryFrom<String> for ChatMode {
	type Error = Error;

	fn try_from(raw: String) -> Result<Self, Self::Error> {
		raw.parse()
	}
}
impl From<ChatMode> for &'static str {
	fn from(mode: ChatMode) -> Self {
		mode.as_str()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
	User,
	Assistant,
}
impl ChatRole {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::User => "user",
			Self::Assistant => "assistant",
		}
	}
}

/// One prior exchange of the conversation a search belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
	pub role: ChatRole,
	pub content: String,
}
impl ChatTurn {
	pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
		Self { role, content: content.into() }
	}
}
