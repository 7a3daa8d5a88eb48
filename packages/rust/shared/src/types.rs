//! Core domain types for LeadScout search results.
//!
//! The canonical record model lives here: source adapters produce
//! [`RawRecord`]s, the pipeline normalizes them into [`NormalizedRecord`]s,
//! and the ordered, source-tagged [`ResultSet`] is what both exporters walk.

use serde::{Deserialize, Serialize};

/// Sentinel rendered for any field whose value the source did not provide.
///
/// Exporters render this string, never an empty cell, so rows always carry
/// their full column count.
pub const UNKNOWN: &str = "N/A";

// ---------------------------------------------------------------------------
// SourceTag
// ---------------------------------------------------------------------------

/// Identifies which adapter produced a record. Attached at aggregation time
/// and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    /// The maps/places listing adapter.
    Maps,
    /// The review-site directory adapter.
    ReviewSite,
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Maps => write!(f, "maps"),
            Self::ReviewSite => write!(f, "review-site"),
        }
    }
}

// ---------------------------------------------------------------------------
// Field
// ---------------------------------------------------------------------------

/// A scalar record field: either a real value or the explicit unknown
/// sentinel. Distinct from `Option` on purpose — a normalized record never
/// has an *absent* field, so exporters can project positionally without
/// bounds checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Field {
    Known(String),
    Unknown,
}

impl Field {
    /// Build a field from an optional source value. `None` and empty strings
    /// both collapse to `Unknown`.
    pub fn from_opt(value: Option<String>) -> Self {
        match value {
            Some(v) if !v.trim().is_empty() => Self::Known(v),
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Known(v) => write!(f, "{v}"),
            Self::Unknown => write!(f, "{UNKNOWN}"),
        }
    }
}

impl From<&str> for Field {
    fn from(value: &str) -> Self {
        Self::from_opt(Some(value.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Tri-state verification status from the review-site source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verification {
    Verified,
    Unverified,
    Unknown,
}

impl std::fmt::Display for Verification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verified => write!(f, "True"),
            Self::Unverified => write!(f, "False"),
            Self::Unknown => write!(f, "{UNKNOWN}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Raw records
// ---------------------------------------------------------------------------

/// A maps-listing record as the adapter yields it. Trailing fields are
/// optional: the upstream detail call omits anything the place never filed.
#[derive(Debug, Clone, PartialEq)]
pub struct MapsRaw {
    pub name: String,
    pub website: Option<String>,
    /// Emails harvested from the place's own website, in first-seen order.
    pub emails: Vec<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub review_count: Option<String>,
}

/// A review-site company record as parsed from the company detail page.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRaw {
    pub name: String,
    pub rating: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub verified: Option<bool>,
    pub website: Option<String>,
    pub review_count: Option<String>,
}

/// An opaque, source-specific record produced by a source adapter.
/// Immutable; discarded after normalization.
///
/// `Fields` is the loose escape hatch: a row of stringly values whose shape
/// no adapter vouches for. The normalizer maps it positionally, best-effort.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    Maps(MapsRaw),
    Review(ReviewRaw),
    Fields(Vec<String>),
}

// ---------------------------------------------------------------------------
// NormalizedRecord
// ---------------------------------------------------------------------------

/// The canonical record shape. Every field is populated with either a real
/// value or the unknown sentinel — never left absent.
///
/// `contact_emails` keeps its structure here; exporters flatten it to a
/// comma-joined string at render time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub company_name: String,
    pub website: Field,
    pub contact_emails: Vec<String>,
    pub phone: Field,
    pub location: Field,
    pub rating: Field,
    pub review_count: Field,
    pub verified: Verification,
}

impl NormalizedRecord {
    /// A record carrying only a company name; every other field unknown.
    /// Used as the base for degraded projections.
    pub fn bare(company_name: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
            website: Field::Unknown,
            contact_emails: Vec::new(),
            phone: Field::Unknown,
            location: Field::Unknown,
            rating: Field::Unknown,
            review_count: Field::Unknown,
            verified: Verification::Unknown,
        }
    }

    /// Render the email sequence the way exporters flatten it.
    pub fn emails_joined(&self) -> String {
        if self.contact_emails.is_empty() {
            UNKNOWN.to_string()
        } else {
            self.contact_emails.join(", ")
        }
    }
}

/// Outcome of normalizing one raw record: clean, or salvaged best-effort.
///
/// Degradation never aborts a batch — callers that care (the spreadsheet
/// exporter) can tell salvaged rows apart; callers that don't (the tabular
/// exporter) render them anyway.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Clean(NormalizedRecord),
    Degraded {
        record: NormalizedRecord,
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// ResultSet
// ---------------------------------------------------------------------------

/// Whether a record survived normalization intact.
#[derive(Debug, Clone, PartialEq)]
pub enum Provenance {
    Clean,
    Degraded { reason: String },
}

/// One entry of the result set: a normalized record plus its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedRecord {
    pub tag: SourceTag,
    pub record: NormalizedRecord,
    pub provenance: Provenance,
}

/// The ordered, source-tagged collection of normalized records for one
/// query. Append-only, insertion-ordered (order of production, never
/// sorted), scoped to a single query's lifetime.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    entries: Vec<TaggedRecord>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one normalized outcome under the producing adapter's tag.
    pub fn push(&mut self, tag: SourceTag, normalized: Normalized) {
        let (record, provenance) = match normalized {
            Normalized::Clean(record) => (record, Provenance::Clean),
            Normalized::Degraded { record, reason } => (record, Provenance::Degraded { reason }),
        };
        self.entries.push(TaggedRecord {
            tag,
            record,
            provenance,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaggedRecord> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count of entries contributed by one source.
    pub fn count_for(&self, tag: SourceTag) -> usize {
        self.entries.iter().filter(|e| e.tag == tag).count()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a TaggedRecord;
    type IntoIter = std::slice::Iter<'a, TaggedRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// ---------------------------------------------------------------------------
// ReviewFilter
// ---------------------------------------------------------------------------

/// Structured filter for the review-site adapter, extracted from the user's
/// free-text query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewFilter {
    /// Business category to resolve against the directory's category index.
    pub category: String,
    /// ISO 3166-1 alpha-2 country code.
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    /// Minimum trust score (directory-native scale).
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub min_reviews: Option<u64>,
    #[serde(default)]
    pub max_reviews: Option<u64>,
}

impl ReviewFilter {
    /// Review-count bounds with the adapter's defaults applied.
    pub fn review_bounds(&self) -> (u64, u64) {
        (
            self.min_reviews.unwrap_or(0),
            self.max_reviews.unwrap_or(u64::MAX),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_from_opt_collapses_empty() {
        assert_eq!(Field::from_opt(None), Field::Unknown);
        assert_eq!(Field::from_opt(Some("  ".into())), Field::Unknown);
        assert_eq!(
            Field::from_opt(Some("https://a.example".into())),
            Field::Known("https://a.example".into())
        );
    }

    #[test]
    fn field_display_renders_sentinel() {
        assert_eq!(Field::Unknown.to_string(), "N/A");
        assert_eq!(Field::Known("x".into()).to_string(), "x");
        assert_eq!(Verification::Unknown.to_string(), "N/A");
        assert_eq!(Verification::Verified.to_string(), "True");
    }

    #[test]
    fn result_set_preserves_insertion_order() {
        let mut set = ResultSet::new();
        set.push(
            SourceTag::Maps,
            Normalized::Clean(NormalizedRecord::bare("a1")),
        );
        set.push(
            SourceTag::Maps,
            Normalized::Clean(NormalizedRecord::bare("a2")),
        );
        set.push(
            SourceTag::ReviewSite,
            Normalized::Clean(NormalizedRecord::bare("b1")),
        );

        let names: Vec<&str> = set.iter().map(|e| e.record.company_name.as_str()).collect();
        assert_eq!(names, vec!["a1", "a2", "b1"]);
        assert_eq!(set.count_for(SourceTag::Maps), 2);
        assert_eq!(set.count_for(SourceTag::ReviewSite), 1);
    }

    #[test]
    fn degraded_entries_keep_their_reason() {
        let mut set = ResultSet::new();
        set.push(
            SourceTag::Maps,
            Normalized::Degraded {
                record: NormalizedRecord::bare("odd"),
                reason: "shape mismatch".into(),
            },
        );
        let entry = set.iter().next().unwrap();
        assert!(matches!(
            entry.provenance,
            Provenance::Degraded { ref reason } if reason == "shape mismatch"
        ));
    }

    #[test]
    fn emails_joined_flattens_or_sentinels() {
        let mut record = NormalizedRecord::bare("acme");
        assert_eq!(record.emails_joined(), "N/A");
        record.contact_emails = vec!["a@acme.test".into(), "b@acme.test".into()];
        assert_eq!(record.emails_joined(), "a@acme.test, b@acme.test");
    }

    #[test]
    fn review_filter_bounds_default_open() {
        let filter = ReviewFilter {
            category: "dentist".into(),
            ..Default::default()
        };
        assert_eq!(filter.review_bounds(), (0, u64::MAX));

        let filter = ReviewFilter {
            category: "dentist".into(),
            min_reviews: Some(10),
            max_reviews: Some(50),
            ..Default::default()
        };
        assert_eq!(filter.review_bounds(), (10, 50));
    }
}
