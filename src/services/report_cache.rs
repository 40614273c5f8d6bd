use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::models::DateRange;
use crate::services::{analytics::Report, metrics::RevenueBasis};

/// Reports are keyed on the store's data version, so any write makes older
/// entries unreachable and they simply age out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReportKey {
    pub range: DateRange,
    pub basis: RevenueBasis,
    pub data_version: u64,
}

#[derive(Clone)]
pub struct ReportCache {
    entries: Cache<ReportKey, Arc<Report>>,
}

impl ReportCache {
    pub fn new(ttl_seconds: u64, max_entries: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(max_entries.max(1))
                .time_to_live(Duration::from_secs(ttl_seconds.max(1)))
                .build(),
        }
    }

    pub async fn get(&self, key: &ReportKey) -> Option<Arc<Report>> {
        self.entries.get(key).await
    }

    pub async fn insert(&self, key: ReportKey, report: Report) -> Arc<Report> {
        let report = Arc::new(report);
        self.entries.insert(key, report.clone()).await;
        report
    }
}
