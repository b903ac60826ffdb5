//! Keyword search over the on-disk HTML legal-document tree.
//!
//! One adapter is registered per source type. Each scans the category folders mapped to its
//! type, scores documents on keyword hits in title, number and body, and derives citation
//! metadata from file names.

use std::{
	cmp::Ordering,
	path::{Path, PathBuf},
	sync::{Arc, LazyLock},
};

use regex::Regex;
use tokio::fs;

use juris_domain::{
	AdapterSearchOptions, BoxFuture, Error, Hit, Result, SourceAdapter, SubQuery, score,
};

use crate::text;

/// Raw score that normalizes to 0.5.
const SCORE_HALF_POINT: f32 = 10.0;
const TITLE_WEIGHT: u32 = 5;
const NUMBER_WEIGHT: u32 = 4;
/// Files scanned per folder whose names match no keyword.
const CONTENT_SCAN_LIMIT: usize = 50;
const SNIPPET_BEFORE: usize = 200;
const SNIPPET_AFTER: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Folder {
	pub category: &'static str,
	pub subcategory: &'static str,
	pub path: &'static str,
}

pub const FOLDERS: &[Folder] = &[
	folder("supreme_court", "decisions", "Supreme Court/Decisions & Signed Resolutions"),
	folder("supreme_court", "case_index", "Supreme Court/SC Case Index"),
	folder("laws", "acts", "Laws/Acts"),
	folder("laws", "batas_pambansa", "Laws/Batas Pambansa"),
	folder("laws", "commonwealth_act", "Laws/Commonwealth Acts"),
	folder("laws", "constitutions", "Laws/Philippine Constitutions"),
	folder("laws", "general_order", "Executive Issuances/General Orders"),
	folder("laws", "letter_of_implementation", "Laws/Letter of Implementation"),
	folder("laws", "letter_of_instruction", "Laws/Letter of Instruction"),
	folder("laws", "presidential_decree", "Laws/Presidential Decree"),
	folder("laws", "republic_acts", "Laws/Republic Acts"),
	folder("laws", "rules_of_court", "Laws/Rules of Court"),
	folder("executive_issuances", "administrative_orders", "Executive Issuances/Administrative Orders"),
	folder("executive_issuances", "executive_orders", "Executive Issuances/Executive Orders"),
	folder("executive_issuances", "memorandum_circulars", "Executive Issuances/Memorandum Circulars"),
	folder("executive_issuances", "memorandum_orders", "Executive Issuances/Memorandum Orders"),
	folder(
		"executive_issuances",
		"national_admin_register",
		"Executive Issuances/National Administrative Register",
	),
	folder(
		"executive_issuances",
		"presidential_proclamations",
		"Executive Issuances/Presidential Proclamations",
	),
	folder("references", "concon_1934", "References/1934-35 ConCon"),
	folder("references", "concom_1986", "References/1986 ConCom"),
	folder("references", "draft_constitution_1986", "References/1986 Draft Constitution"),
	folder(
		"references",
		"sc_issuances_collation",
		"References/Collation and Codification of SC Issuances",
	),
	folder("references", "judicial_forms", "References/Revised Book of Judicial Forms"),
	folder("references", "sc_stylebook", "References/Supreme Court Stylebook First Edition"),
	folder("references", "benchbooks", "References/Benchbooks"),
	folder("references", "election_cases", "References/Election Cases"),
	folder("references", "decision_writing", "References/Fundamentals of Decision Writing"),
	folder("references", "judicial_writing", "References/Manual of Judicial Writing"),
	folder("references", "clerks_manual", "References/Manuals of Clerks of Court"),
	folder("references", "official_gazette", "References/Official Gazette"),
	folder("treaties", "bilateral", "Treaties/Bilateral"),
	folder("treaties", "regional", "Treaties/Regional ~ Multilateral"),
	folder("international_laws", "international", "International Laws"),
];

/// Source type (registry name) to the folder category it covers.
pub const SOURCE_TYPES: &[(&str, &str)] = &[
	("law", "laws"),
	("jurisprudence", "supreme_court"),
	("issuance", "executive_issuances"),
	("reference", "references"),
	("treaty", "treaties"),
	("international", "international_laws"),
];

/// Prefix, title template and number template for statute-style file names such as `ra_10951_2017`.
const STATUTE_PREFIXES: &[(&str, &str, &str)] = &[
	("ra", "Republic Act No.", "R.A. No."),
	("act", "Act No.", "Act No."),
	("bp", "Batas Pambansa Blg.", "B.P. Blg."),
	("eo", "Executive Order No.", "E.O. No."),
	("ao", "Administrative Order No.", "A.O. No."),
	("pd", "Presidential Decree No.", "P.D. No."),
	("go", "General Order No.", "G.O. No."),
	("proc", "Presidential Proclamation No.", "Proc. No."),
];

struct MetaPatterns {
	html_ext: Regex,
	gr_prefix: Regex,
	gr_number: Regex,
	year_word: Regex,
	statute: Regex,
	trailing_year: Regex,
}

static META: LazyLock<Option<MetaPatterns>> = LazyLock::new(|| {
	Some(MetaPatterns {
		html_ext: Regex::new(r"(?i)\.html?$").ok()?,
		gr_prefix: Regex::new(r"(?i)^G\.?R\.?\s+No\.").ok()?,
		gr_number: Regex::new(r"(?i)^(G\.?R\.?\s+No\.\s+[\w-]+)").ok()?,
		year_word: Regex::new(r"\b(\d{4})\b").ok()?,
		statute: Regex::new(r"(?i)^([a-z]+)_(.+?)_(\d{4})$").ok()?,
		trailing_year: Regex::new(r"[_-]?(\d{4})(?:[_-]\d+)?$").ok()?,
	})
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMeta {
	pub title: String,
	pub number: Option<String>,
	pub year: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LegalDatabaseAdapter {
	name: String,
	root: PathBuf,
	folders: Vec<Folder>,
}
impl LegalDatabaseAdapter {
	pub fn new(source_type: &str, root: impl Into<PathBuf>) -> Result<Self> {
		let Some((name, category)) = SOURCE_TYPES.iter().find(|(name, _)| *name == source_type)
		else {
			return Err(Error::UnknownAdapter { name: source_type.to_string() });
		};
		let folders = FOLDERS.iter().filter(|f| f.category == *category).copied().collect();

		Ok(Self { name: (*name).to_string(), root: root.into(), folders })
	}

	/// One adapter per source type, all reading the same tree.
	pub fn all(root: &Path) -> Vec<Arc<dyn SourceAdapter>> {
		SOURCE_TYPES
			.iter()
			.filter_map(|(name, _)| Self::new(name, root).ok())
			.map(|adapter| Arc::new(adapter) as Arc<dyn SourceAdapter>)
			.collect()
	}

	async fn search_folder(&self, folder: &Folder, keywords: &[String]) -> Vec<Hit> {
		let files = list_html_files(&self.root.join(folder.path)).await;
		let (named, unnamed): (Vec<_>, Vec<_>) = files.into_iter().partition(|file| {
			let lower = file.filename.to_lowercase();

			keywords.iter().any(|kw| lower.contains(kw.as_str()))
		});
		let mut hits = Vec::new();

		for file in named.into_iter().chain(unnamed.into_iter().take(CONTENT_SCAN_LIMIT)) {
			let html = match fs::read_to_string(&file.path).await {
				Ok(html) => html,
				Err(err) => {
					tracing::debug!(
						error = %err,
						adapter = self.name.as_str(),
						path = %file.path.display(),
						"Skipping unreadable document."
					);

					continue;
				},
			};
			let body = text::html_to_text(&html);
			let meta = parse_meta(&file.filename);
			let raw = score_document(&body, &meta, keywords);

			if raw == 0 {
				continue;
			}

			let relative = file
				.path
				.strip_prefix(&self.root)
				.unwrap_or(file.path.as_path())
				.to_string_lossy()
				.replace('\\', "/");

			hits.push(Hit {
				id: relative.clone(),
				title: meta.title,
				category: folder.category.to_string(),
				subcategory: folder.subcategory.to_string(),
				number: meta.number,
				date: file.year_folder.or(meta.year),
				score: raw as f32,
				relevant_text: text::snippet(&body, keywords, SNIPPET_BEFORE, SNIPPET_AFTER)
					.unwrap_or_default(),
				path: Some(relative),
			});
		}

		hits
	}
}
impl SourceAdapter for LegalDatabaseAdapter {
	fn name(&self) -> &str {
		&self.name
	}

	fn search<'a>(
		&'a self,
		query: &'a SubQuery,
		options: &'a AdapterSearchOptions,
	) -> BoxFuture<'a, Result<Vec<Hit>>> {
		Box::pin(async move {
			if !fs::try_exists(&self.root).await.unwrap_or(false) {
				return Err(Error::adapter(
					&self.name,
					format!("Corpus root {} is not readable.", self.root.display()),
				));
			}

			let keywords = text::keywords(&query.text);

			if keywords.is_empty() || options.limit == 0 {
				return Ok(Vec::new());
			}

			let folders = self.folders.iter().filter(|folder| match options.category_filter.as_deref() {
				Some(filter) => folder.subcategory == filter || folder.category == filter,
				None => true,
			});
			let batches = futures::future::join_all(
				folders.map(|folder| self.search_folder(folder, &keywords)),
			)
			.await;
			let mut hits: Vec<Hit> = batches.into_iter().flatten().collect();

			hits.sort_by(|a, b| {
				b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal).then_with(|| a.id.cmp(&b.id))
			});
			hits.truncate(options.limit as usize);

			Ok(hits)
		})
	}

	fn normalize_score(&self, raw: f32) -> f32 {
		score::saturate(raw, SCORE_HALF_POINT)
	}
}

struct HtmlFile {
	filename: String,
	path: PathBuf,
	year_folder: Option<String>,
}

/// Lists HTML files directly under `dir`, or under its four-digit year folders when any exist.
async fn list_html_files(dir: &Path) -> Vec<HtmlFile> {
	let Ok(entries) = read_dir_entries(dir).await else {
		return Vec::new();
	};
	let year_dirs: Vec<_> = entries
		.iter()
		.filter(|(name, is_dir)| *is_dir && name.len() == 4 && name.chars().all(|c| c.is_ascii_digit()))
		.map(|(name, _)| name.clone())
		.collect();
	let mut files = Vec::new();

	if year_dirs.is_empty() {
		for (name, is_dir) in entries {
			if !is_dir && is_html(&name) {
				files.push(HtmlFile { path: dir.join(&name), filename: name, year_folder: None });
			}
		}

		return files;
	}

	for year in year_dirs {
		let year_path = dir.join(&year);
		let Ok(entries) = read_dir_entries(&year_path).await else {
			continue;
		};

		for (name, is_dir) in entries {
			if !is_dir && is_html(&name) {
				files.push(HtmlFile {
					path: year_path.join(&name),
					filename: name,
					year_folder: Some(year.clone()),
				});
			}
		}
	}

	files
}

async fn read_dir_entries(dir: &Path) -> std::io::Result<Vec<(String, bool)>> {
	let mut reader = fs::read_dir(dir).await?;
	let mut entries = Vec::new();

	while let Some(entry) = reader.next_entry().await? {
		let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);

		entries.push((entry.file_name().to_string_lossy().into_owned(), is_dir));
	}

	entries.sort();

	Ok(entries)
}

fn is_html(name: &str) -> bool {
	let lower = name.to_ascii_lowercase();

	lower.ends_with(".html") || lower.ends_with(".htm")
}

fn score_document(body: &str, meta: &DocumentMeta, keywords: &[String]) -> u32 {
	let title = meta.title.to_lowercase();
	let number = meta.number.as_deref().unwrap_or_default().to_lowercase();
	let body = body.to_lowercase();

	keywords
		.iter()
		.map(|kw| {
			let mut score = 0;

			if title.contains(kw.as_str()) {
				score += TITLE_WEIGHT;
			}
			if !number.is_empty() && number.contains(kw.as_str()) {
				score += NUMBER_WEIGHT;
			}

			score + text::keyword_hits(&body, std::slice::from_ref(kw))
		})
		.sum()
}

/// Derives a display title, citation number and year from a document file name.
pub fn parse_meta(filename: &str) -> DocumentMeta {
	let Some(p) = META.as_ref() else {
		return DocumentMeta { title: filename.to_string(), number: None, year: None };
	};
	let name = p.html_ext.replace(filename, "").into_owned();

	if p.gr_prefix.is_match(&name) {
		let number = p
			.gr_number
			.captures(&name)
			.and_then(|c| c.get(1))
			.map(|m| m.as_str().trim().to_string())
			.unwrap_or_else(|| name.clone());
		let year = p.year_word.captures(&name).and_then(|c| c.get(1)).map(|m| m.as_str().to_string());

		return DocumentMeta { title: name, number: Some(number), year };
	}

	if let Some(caps) = p.statute.captures(&name) {
		let prefix = caps.get(1).map(|m| m.as_str().to_ascii_lowercase()).unwrap_or_default();
		let ident = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
		let year = caps.get(3).map(|m| m.as_str().to_string());

		if let Some((_, title, number)) = STATUTE_PREFIXES.iter().find(|(p, _, _)| *p == prefix) {
			return DocumentMeta {
				title: format!("{title} {}", ident.replace('_', " ")),
				number: Some(format!("{number} {ident}")),
				year,
			};
		}
	}

	let year = p.trailing_year.captures(&name).and_then(|c| c.get(1)).map(|m| m.as_str().to_string());
	let stem = p.trailing_year.replace(&name, "").replace('_', " ");
	let title = title_case(stem.trim());

	DocumentMeta { title: if title.is_empty() { name } else { title }, number: None, year }
}

fn title_case(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());
	let mut at_word_start = true;

	for c in raw.chars() {
		if at_word_start && c.is_alphanumeric() {
			out.extend(c.to_uppercase());
		} else {
			out.push(c);
		}

		at_word_start = !(c.is_alphanumeric() || c == '_');
	}

	out
}

const fn folder(category: &'static str, subcategory: &'static str, path: &'static str) -> Folder {
	Folder { category, subcategory, path }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_statute_file_names() {
		assert_eq!(
			parse_meta("ra_10951_2017.html"),
			DocumentMeta {
				title: "Republic Act No. 10951".to_string(),
				number: Some("R.A. No. 10951".to_string()),
				year: Some("2017".to_string()),
			}
		);
		assert_eq!(
			parse_meta("PD_1529_1978.htm").number.as_deref(),
			Some("P.D. No. 1529")
		);
	}

	#[test]
	fn parses_case_file_names() {
		let meta = parse_meta("G.R. No. 186227 People v. Mantalaba July 20, 2011.html");

		assert_eq!(meta.number.as_deref(), Some("G.R. No. 186227"));
		assert_eq!(meta.year.as_deref(), Some("2011"));
		assert!(meta.title.starts_with("G.R. No. 186227"));
	}

	#[test]
	fn humanizes_other_file_names() {
		let meta = parse_meta("rules_on_evidence_2019.html");

		assert_eq!(meta.title, "Rules On Evidence");
		assert_eq!(meta.number, None);
		assert_eq!(meta.year.as_deref(), Some("2019"));
	}

	#[test]
	fn title_and_number_outweigh_body() {
		let meta = DocumentMeta {
			title: "Labor Code".to_string(),
			number: Some("P.D. No. 442".to_string()),
			year: None,
		};
		let keywords = vec!["labor".to_string(), "442".to_string()];

		// labor: title 5 + body 1; 442: number 4 + body 0.
		assert_eq!(score_document("Labor relations.", &meta, &keywords), 10);
	}

	#[test]
	fn source_types_map_to_categories() {
		let adapter = LegalDatabaseAdapter::new("jurisprudence", "/tmp").expect("known type");

		assert!(adapter.folders.iter().all(|f| f.category == "supreme_court"));
		assert_eq!(adapter.folders.len(), 2);
		assert!(LegalDatabaseAdapter::new("statutes", "/tmp").is_err());
	}

	#[test]
	fn normalization_is_saturating() {
		let adapter = LegalDatabaseAdapter::new("law", "/tmp").expect("known type");

		assert_eq!(adapter.normalize_score(10.0), 0.5);
		assert!(adapter.normalize_score(40.0) > adapter.normalize_score(20.0));
		assert!(adapter.normalize_score(1e9) <= 1.0);
	}
}
