//! Score normalization, cross-round dedup and the total result ordering.

use std::{
	cmp::Ordering,
	collections::{BTreeSet, HashMap},
	sync::Arc,
};

use juris_domain::{DedupKey, Hit, RankedResult, SourceAdapter, score};

/// Hits one adapter returned for one sub-query.
pub struct AdapterBatch {
	pub adapter: Arc<dyn SourceAdapter>,
	pub hits: Vec<Hit>,
}

struct Merged {
	adapter: String,
	hit: Hit,
	normalized_score: f32,
	excerpts: BTreeSet<String>,
}

/// Accumulates normalized hits across rounds, keyed by (adapter, document id).
#[derive(Default)]
pub struct Merger {
	entries: HashMap<DedupKey, Merged>,
}
impl Merger {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn contains(&self, key: &DedupKey) -> bool {
		self.entries.contains_key(key)
	}

	/// Case-insensitive match against the titles merged so far.
	pub fn has_title(&self, title: &str) -> bool {
		let wanted = title.trim().to_lowercase();

		!wanted.is_empty()
			&& self.entries.values().any(|entry| entry.hit.title.trim().to_lowercase() == wanted)
	}

	/// Merges a round's batches and returns how many documents were not seen before.
	pub fn merge(&mut self, batches: Vec<AdapterBatch>) -> usize {
		let mut added = 0;

		for batch in batches {
			let adapter = batch.adapter.name().to_string();

			for hit in batch.hits {
				let normalized_score = normalize(batch.adapter.as_ref(), hit.score);

				if self.insert(&adapter, hit, normalized_score) {
					added += 1;
				}
			}
		}

		added
	}

	fn insert(&mut self, adapter: &str, hit: Hit, normalized_score: f32) -> bool {
		let key = DedupKey { adapter: adapter.to_string(), document_id: hit.id.clone() };

		match self.entries.get_mut(&key) {
			Some(existing) => {
				push_excerpt(&mut existing.excerpts, &hit.relevant_text);

				if outranks(normalized_score, &hit, existing.normalized_score, &existing.hit) {
					existing.hit = hit;
					existing.normalized_score = normalized_score;
				}

				false
			},
			None => {
				let mut excerpts = BTreeSet::new();

				push_excerpt(&mut excerpts, &hit.relevant_text);
				self.entries.insert(
					key,
					Merged { adapter: adapter.to_string(), hit, normalized_score, excerpts },
				);

				true
			},
		}
	}

	/// Current ordering truncated to `limit`, ranks starting at 1.
	pub fn ranked(&self, limit: usize) -> Vec<RankedResult> {
		let mut results: Vec<RankedResult> = self
			.entries
			.values()
			.map(|entry| {
				let primary = entry.hit.relevant_text.trim();
				let mut excerpts = Vec::with_capacity(entry.excerpts.len());

				if !primary.is_empty() {
					excerpts.push(primary.to_string());
				}

				excerpts.extend(entry.excerpts.iter().filter(|e| e.as_str() != primary).cloned());

				RankedResult {
					adapter: entry.adapter.clone(),
					hit: entry.hit.clone(),
					excerpts,
					normalized_score: entry.normalized_score,
					rank: 0,
				}
			})
			.collect();

		order(&mut results);
		results.truncate(limit);

		for (idx, result) in results.iter_mut().enumerate() {
			result.rank = idx as u32 + 1;
		}

		results
	}
}

/// Adapter-defined normalization, forced into `[0, 1]` with non-finite values mapped to zero.
pub fn normalize(adapter: &dyn SourceAdapter, raw: f32) -> f32 {
	if !raw.is_finite() {
		return 0.0;
	}

	score::clamp_unit(adapter.normalize_score(raw))
}

/// Descending score, then newest date (missing dates last), then title, adapter and id.
pub fn compare(a: &RankedResult, b: &RankedResult) -> Ordering {
	b.normalized_score
		.total_cmp(&a.normalized_score)
		.then_with(|| cmp_date_desc(a.hit.date.as_deref(), b.hit.date.as_deref()))
		.then_with(|| a.hit.title.cmp(&b.hit.title))
		.then_with(|| a.adapter.cmp(&b.adapter))
		.then_with(|| a.hit.id.cmp(&b.hit.id))
}

pub fn order(results: &mut [RankedResult]) {
	results.sort_by(compare);
}

fn cmp_date_desc(a: Option<&str>, b: Option<&str>) -> Ordering {
	match (a, b) {
		(Some(a), Some(b)) => b.cmp(a),
		(Some(_), None) => Ordering::Less,
		(None, Some(_)) => Ordering::Greater,
		(None, None) => Ordering::Equal,
	}
}

fn outranks(score: f32, hit: &Hit, current_score: f32, current: &Hit) -> bool {
	match score.total_cmp(&current_score) {
		Ordering::Greater => true,
		Ordering::Less => false,
		Ordering::Equal => hit.relevant_text < current.relevant_text,
	}
}

fn push_excerpt(excerpts: &mut BTreeSet<String>, text: &str) {
	let text = text.trim();

	if !text.is_empty() {
		excerpts.insert(text.to_string());
	}
}

#[cfg(test)]
mod tests {
	use juris_domain::{AdapterSearchOptions, BoxFuture, Result, SubQuery};

	use super::*;

	struct Linear(&'static str);
	impl SourceAdapter for Linear {
		fn name(&self) -> &str {
			self.0
		}

		fn search<'a>(
			&'a self,
			_query: &'a SubQuery,
			_options: &'a AdapterSearchOptions,
		) -> BoxFuture<'a, Result<Vec<Hit>>> {
			Box::pin(async { Ok(Vec::new()) })
		}

		fn normalize_score(&self, raw: f32) -> f32 {
			raw / 10.0
		}
	}

	fn hit(id: &str, title: &str, date: Option<&str>, score: f32, text: &str) -> Hit {
		Hit {
			id: id.to_string(),
			title: title.to_string(),
			category: "laws".to_string(),
			subcategory: "acts".to_string(),
			number: None,
			date: date.map(str::to_string),
			score,
			relevant_text: text.to_string(),
			path: None,
		}
	}

	fn batch(adapter: &'static str, hits: Vec<Hit>) -> AdapterBatch {
		AdapterBatch { adapter: Arc::new(Linear(adapter)), hits }
	}

	#[test]
	fn collisions_keep_the_higher_score_and_union_excerpts() {
		let mut merger = Merger::new();
		let added = merger.merge(vec![
			batch("law", vec![hit("a", "A", None, 3.0, "first span")]),
			batch("law", vec![hit("a", "A", None, 7.0, "second span")]),
		]);
		let ranked = merger.ranked(10);

		assert_eq!(added, 1);
		assert_eq!(ranked.len(), 1);
		assert_eq!(ranked[0].normalized_score, 0.7);
		assert_eq!(ranked[0].hit.relevant_text, "second span");
		assert_eq!(ranked[0].excerpts, vec!["second span", "first span"]);
	}

	#[test]
	fn same_id_from_different_adapters_is_distinct() {
		let mut merger = Merger::new();

		merger.merge(vec![
			batch("law", vec![hit("a", "A", None, 3.0, "x")]),
			batch("treaty", vec![hit("a", "A", None, 3.0, "x")]),
		]);

		assert_eq!(merger.len(), 2);
	}

	#[test]
	fn ties_break_on_date_then_title() {
		let mut merger = Merger::new();

		merger.merge(vec![batch(
			"law",
			vec![
				hit("1", "Zeta", Some("2019"), 5.0, ""),
				hit("2", "Alpha", Some("2019"), 5.0, ""),
				hit("3", "Beta", Some("2021"), 5.0, ""),
				hit("4", "Aardvark", None, 5.0, ""),
				hit("5", "Top", None, 9.0, ""),
			],
		)]);

		let titles: Vec<_> = merger.ranked(10).into_iter().map(|r| r.hit.title).collect();

		assert_eq!(titles, vec!["Top", "Beta", "Alpha", "Zeta", "Aardvark"]);
	}

	#[test]
	fn ordering_ignores_arrival_order() {
		let hits = vec![
			hit("1", "One", Some("2020"), 4.0, "a"),
			hit("2", "Two", Some("2020"), 4.0, "b"),
			hit("3", "Three", None, 6.0, "c"),
		];
		let mut forward = Merger::new();
		let mut backward = Merger::new();

		forward.merge(vec![batch("law", hits.clone())]);
		backward.merge(vec![batch("law", hits.into_iter().rev().collect())]);

		let ids = |m: &Merger| m.ranked(10).into_iter().map(|r| r.hit.id).collect::<Vec<_>>();

		assert_eq!(ids(&forward), ids(&backward));
	}

	#[test]
	fn scores_are_clamped_and_ranks_assigned() {
		let mut merger = Merger::new();

		merger.merge(vec![batch(
			"law",
			vec![hit("a", "A", None, f32::NAN, ""), hit("b", "B", None, 50.0, "")],
		)]);

		let ranked = merger.ranked(1);

		assert_eq!(ranked.len(), 1);
		assert_eq!(ranked[0].normalized_score, 1.0);
		assert_eq!(ranked[0].rank, 1);
		assert!(merger.has_title(" b "));
	}
}
