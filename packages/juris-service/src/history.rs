//! Fire-and-forget search history.

use std::sync::Arc;

use serde::Serialize;

use juris_config::Strategy;
use juris_domain::BoxFuture;

/// Longest query prefix kept in a history entry, in chars.
pub const MAX_HISTORY_QUERY_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
	pub query: String,
	pub source_filter: Vec<String>,
	pub strategy: Strategy,
	pub result_count: u32,
}
impl HistoryEntry {
	pub fn new(query: &str, source_filter: &[String], strategy: Strategy, result_count: u32) -> Self {
		Self {
			query: query.chars().take(MAX_HISTORY_QUERY_CHARS).collect(),
			source_filter: source_filter.to_vec(),
			strategy,
			result_count,
		}
	}
}

pub trait HistorySink
where
	Self: Send + Sync,
{
	fn record(&self, entry: HistoryEntry) -> BoxFuture<'_, color_eyre::Result<()>>;
}

/// Default sink: one structured log line per search.
pub struct TracingHistory;
impl HistorySink for TracingHistory {
	fn record(&self, entry: HistoryEntry) -> BoxFuture<'_, color_eyre::Result<()>> {
		Box::pin(async move {
			tracing::info!(
				query = entry.query.as_str(),
				strategy = entry.strategy.as_str(),
				sources = ?entry.source_filter,
				result_count = entry.result_count,
				"Search recorded."
			);

			Ok(())
		})
	}
}

/// Hands the entry to the sink on a detached task; failures are logged and never surface.
pub(crate) fn record_detached(sink: &Arc<dyn HistorySink>, entry: HistoryEntry) {
	let sink = Arc::clone(sink);

	tokio::spawn(async move {
		if let Err(err) = sink.record(entry).await {
			tracing::warn!(error = %err, "History sink failed.");
		}
	});
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn entries_truncate_long_queries() {
		let query = "é".repeat(MAX_HISTORY_QUERY_CHARS + 20);
		let entry = HistoryEntry::new(&query, &["law".to_string()], Strategy::Quick, 3);

		assert_eq!(entry.query.chars().count(), MAX_HISTORY_QUERY_CHARS);
		assert_eq!(entry.source_filter, vec!["law".to_string()]);
	}
}
