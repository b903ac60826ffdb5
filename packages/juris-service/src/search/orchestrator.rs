//! One retrieval round: every sub-query against every selected adapter, concurrently.

use std::{collections::BTreeSet, sync::Arc, time::Duration};

use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant};

use juris_domain::{AdapterSearchOptions, Hit, SourceAdapter, SubQuery};

use crate::search::ranking::AdapterBatch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "message")]
pub enum FailureReason {
	Error(String),
	Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterFailure {
	pub adapter: String,
	pub sub_query: String,
	pub round: u32,
	pub reason: FailureReason,
}

pub struct Round<'a> {
	pub number: u32,
	pub sub_queries: &'a [SubQuery],
	pub adapters: &'a [Arc<dyn SourceAdapter>],
	pub per_adapter_limit: u32,
	pub adapter_timeout: Duration,
	/// Calls still running at this instant are abandoned and recorded as timeouts.
	pub deadline: Instant,
}

#[derive(Default)]
pub struct RoundOutput {
	pub batches: Vec<AdapterBatch>,
	pub failures: Vec<AdapterFailure>,
	/// Hits returned across all calls, before dedup.
	pub scanned: u32,
	pub calls: usize,
	pub succeeded: usize,
}

/// `ceil(max_results / sub_query_count) + 3`, bounded by the configured per-adapter ceiling.
pub fn per_adapter_limit(max_results: u32, sub_query_count: usize, max_hits_per_adapter: u32) -> u32 {
	let count = (sub_query_count.max(1)) as u32;

	(max_results.div_ceil(count) + 3).min(max_hits_per_adapter).max(1)
}

pub async fn run_round(round: Round<'_>) -> RoundOutput {
	let mut out = RoundOutput::default();
	let options = AdapterSearchOptions { category_filter: None, limit: round.per_adapter_limit };
	let options = &options;
	let mut pending = BTreeSet::new();
	let mut calls = FuturesUnordered::new();

	for (q_idx, sub_query) in round.sub_queries.iter().enumerate() {
		for (a_idx, adapter) in round.adapters.iter().enumerate() {
			let adapter = Arc::clone(adapter);
			let timeout = round.adapter_timeout;

			pending.insert((q_idx, a_idx));
			calls.push(async move {
				let result = time::timeout(timeout, adapter.search(sub_query, options)).await;

				(q_idx, a_idx, adapter, result)
			});
		}
	}

	out.calls = calls.len();

	loop {
		let next = match time::timeout_at(round.deadline, calls.next()).await {
			Ok(Some(next)) => next,
			Ok(None) => break,
			Err(_) => {
				tracing::warn!(
					round = round.number,
					outstanding = pending.len(),
					"Round deadline elapsed; keeping partial results."
				);

				break;
			},
		};
		let (q_idx, a_idx, adapter, result) = next;
		let sub_query = &round.sub_queries[q_idx];

		pending.remove(&(q_idx, a_idx));

		match result {
			Ok(Ok(mut hits)) => {
				hits.truncate(round.per_adapter_limit as usize);

				out.scanned += hits.len() as u32;
				out.succeeded += 1;
				out.batches.push(AdapterBatch { adapter, hits: drop_blank_ids(hits) });
			},
			Ok(Err(err)) => {
				tracing::warn!(
					error = %err,
					adapter = adapter.name(),
					round = round.number,
					stage = "retrieve",
					"Adapter failed; continuing without it."
				);
				out.failures.push(failure(
					&adapter,
					sub_query,
					round.number,
					FailureReason::Error(err.to_string()),
				));
			},
			Err(_) => {
				tracing::warn!(
					adapter = adapter.name(),
					round = round.number,
					stage = "retrieve",
					timeout_ms = round.adapter_timeout.as_millis() as u64,
					"Adapter timed out; continuing without it."
				);
				out.failures.push(failure(&adapter, sub_query, round.number, FailureReason::Timeout));
			},
		}
	}

	drop(calls);

	for (q_idx, a_idx) in pending {
		out.failures.push(failure(
			&round.adapters[a_idx],
			&round.sub_queries[q_idx],
			round.number,
			FailureReason::Timeout,
		));
	}

	out
}

fn failure(
	adapter: &Arc<dyn SourceAdapter>,
	sub_query: &SubQuery,
	round: u32,
	reason: FailureReason,
) -> AdapterFailure {
	AdapterFailure {
		adapter: adapter.name().to_string(),
		sub_query: sub_query.text.clone(),
		round,
		reason,
	}
}

fn drop_blank_ids(hits: Vec<Hit>) -> Vec<Hit> {
	hits.into_iter().filter(|hit| !hit.id.trim().is_empty()).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn per_adapter_limit_follows_sub_query_count() {
		assert_eq!(per_adapter_limit(15, 1, 50), 18);
		assert_eq!(per_adapter_limit(20, 3, 50), 10);
		assert_eq!(per_adapter_limit(20, 3, 8), 8);
		assert_eq!(per_adapter_limit(10, 0, 50), 13);
	}
}
