//! Keyword search over a directory of user-uploaded documents.
//!
//! Files directly under the root are uncategorized; files one level down take their folder
//! name as subcategory. Text and HTML files are read; anything else is ignored.

use std::{
	cmp::Ordering,
	path::{Path, PathBuf},
};

use tokio::fs;

use juris_domain::{
	AdapterKind, AdapterSearchOptions, BoxFuture, Error, Hit, Result, SourceAdapter, SubQuery,
	score,
};

use crate::text;

pub const NAME: &str = "user_files";
pub const CATEGORY: &str = "user_files";
const UNCATEGORIZED: &str = "uncategorized";
const SCORE_HALF_POINT: f32 = 5.0;
const NAME_WEIGHT: u32 = 3;
const CHUNK_SIZE: usize = 800;
const CHUNK_OVERLAP: usize = 200;
const MAX_EXCERPT_CHARS: usize = 600;
const MIN_TEXT_CHARS: usize = 10;
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "json", "xml", "csv", "rtf"];
const HTML_EXTENSIONS: &[&str] = &["html", "htm"];

#[derive(Debug, Clone)]
pub struct UserFilesAdapter {
	root: PathBuf,
}
impl UserFilesAdapter {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	async fn collect_files(&self, category_filter: Option<&str>) -> Result<Vec<UserFile>> {
		let mut reader = fs::read_dir(&self.root).await.map_err(|err| Error::adapter(NAME, err))?;
		let mut files = Vec::new();
		let mut folders = Vec::new();

		while let Some(entry) = reader.next_entry().await.map_err(|err| Error::adapter(NAME, err))? {
			let path = entry.path();
			let Ok(file_type) = entry.file_type().await else {
				continue;
			};

			if file_type.is_dir() {
				folders.push(path);
			} else if file_type.is_file() {
				files.push(UserFile { path, subcategory: UNCATEGORIZED.to_string() });
			}
		}

		for folder in folders {
			let Some(subcategory) = folder.file_name().map(|n| n.to_string_lossy().into_owned())
			else {
				continue;
			};
			let Ok(mut reader) = fs::read_dir(&folder).await else {
				continue;
			};

			while let Ok(Some(entry)) = reader.next_entry().await {
				if entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
					files.push(UserFile { path: entry.path(), subcategory: subcategory.clone() });
				}
			}
		}

		if let Some(filter) = category_filter.filter(|f| *f != "all") {
			files.retain(|file| file.subcategory == filter);
		}

		files.sort_by(|a, b| a.path.cmp(&b.path));

		Ok(files)
	}

	async fn score_file(&self, file: &UserFile, keywords: &[String]) -> Option<Hit> {
		let kind = file_kind(&file.path)?;
		let raw = match fs::read_to_string(&file.path).await {
			Ok(raw) => raw,
			Err(err) => {
				tracing::debug!(
					error = %err,
					adapter = NAME,
					path = %file.path.display(),
					"Skipping unreadable user file."
				);

				return None;
			},
		};
		let body = match kind {
			FileKind::Html => text::html_to_text(&raw),
			FileKind::Text => raw,
		};

		if body.trim().chars().count() < MIN_TEXT_CHARS {
			return None;
		}

		let name = file.path.file_name()?.to_string_lossy().into_owned();
		let name_score = text::keyword_hits(&name.to_lowercase(), keywords) * NAME_WEIGHT;
		let chunks = text::chunk_text(&body, CHUNK_SIZE, CHUNK_OVERLAP);
		let mut best = chunks.first()?;
		let mut best_score = 0;

		for chunk in &chunks {
			let score = text::keyword_hits(&chunk.text.to_lowercase(), keywords);

			if score > best_score {
				best = chunk;
				best_score = score;
			}
		}

		let total = name_score + best_score;

		if total == 0 {
			return None;
		}

		let relative = file
			.path
			.strip_prefix(&self.root)
			.unwrap_or(file.path.as_path())
			.to_string_lossy()
			.replace('\\', "/");
		let date = match fs::metadata(&file.path).await.and_then(|m| m.modified()) {
			Ok(modified) => Some(time::OffsetDateTime::from(modified).date().to_string()),
			Err(_) => None,
		};

		Some(Hit {
			id: format!("userfile:{relative}"),
			title: name,
			category: CATEGORY.to_string(),
			subcategory: file.subcategory.clone(),
			number: None,
			date,
			score: total as f32,
			relevant_text: text::truncate_chars(&best.text, MAX_EXCERPT_CHARS),
			path: Some(relative),
		})
	}
}
impl SourceAdapter for UserFilesAdapter {
	fn name(&self) -> &str {
		NAME
	}

	fn kind(&self) -> AdapterKind {
		AdapterKind::UserFiles
	}

	fn search<'a>(
		&'a self,
		query: &'a SubQuery,
		options: &'a AdapterSearchOptions,
	) -> BoxFuture<'a, Result<Vec<Hit>>> {
		Box::pin(async move {
			let keywords = text::keywords(&query.text);

			if keywords.is_empty() || options.limit == 0 {
				return Ok(Vec::new());
			}

			let files = self.collect_files(options.category_filter.as_deref()).await?;
			let mut hits = Vec::new();

			for file in &files {
				if let Some(hit) = self.score_file(file, &keywords).await {
					hits.push(hit);
				}
			}

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

struct UserFile {
	path: PathBuf,
	subcategory: String,
}

enum FileKind {
	Html,
	Text,
}

fn file_kind(path: &Path) -> Option<FileKind> {
	let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();

	if HTML_EXTENSIONS.contains(&ext.as_str()) {
		Some(FileKind::Html)
	} else if TEXT_EXTENSIONS.contains(&ext.as_str()) {
		Some(FileKind::Text)
	} else {
		None
	}
}
