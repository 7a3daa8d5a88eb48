//! Aggregation: adapter outputs → one ordered, source-tagged result set.
//!
//! Pure append. The aggregator performs no cross-source merge: a company
//! found by both sources appears once per tag. Within-source dedup is the
//! producing adapter's business (the review-site adapter dedups before
//! handing records over; the maps adapter does not).

use leadscout_shared::{RawRecord, ResultSet, SourceTag};

use crate::normalize::normalize;

/// Collect all adapters' raw output into one result set, in producer order.
///
/// Records from the first adapter precede records from later adapters, and
/// within an adapter, the adapter's yield order is preserved.
pub fn aggregate(adapter_results: Vec<(SourceTag, Vec<RawRecord>)>) -> ResultSet {
    let mut set = ResultSet::new();
    for (tag, records) in adapter_results {
        for raw in records {
            set.push(tag, normalize(tag, raw));
        }
    }
    set
}
