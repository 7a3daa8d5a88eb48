//! Record normalization: source-specific raw shapes → the canonical schema.
//!
//! Each source tag implies a known raw shape. Matching shapes normalize
//! cleanly, padding absent trailing fields with the unknown sentinel.
//! Anything else degrades to a best-effort record instead of failing —
//! a single malformed record must never abort the batch.

use tracing::warn;

use leadscout_shared::{
    Field, MapsRaw, Normalized, NormalizedRecord, RawRecord, ReviewRaw, SourceTag, UNKNOWN,
    Verification,
};

/// Normalize one raw record produced under the given source tag.
pub fn normalize(tag: SourceTag, raw: RawRecord) -> Normalized {
    match (tag, raw) {
        (SourceTag::Maps, RawRecord::Maps(m)) => Normalized::Clean(from_maps(m)),
        (SourceTag::ReviewSite, RawRecord::Review(r)) => Normalized::Clean(from_review(r)),
        (tag, RawRecord::Fields(fields)) => degrade_fields(tag, fields),
        (tag, raw) => degrade_mismatch(tag, raw),
    }
}

fn from_maps(m: MapsRaw) -> NormalizedRecord {
    NormalizedRecord {
        company_name: m.name,
        website: Field::from_opt(m.website),
        contact_emails: m.emails,
        phone: Field::from_opt(m.phone),
        location: Field::from_opt(m.address),
        // The listing source carries no trust data.
        rating: Field::Unknown,
        review_count: Field::from_opt(m.review_count),
        verified: Verification::Unknown,
    }
}

fn from_review(r: ReviewRaw) -> NormalizedRecord {
    NormalizedRecord {
        company_name: r.name,
        website: Field::from_opt(r.website),
        contact_emails: r
            .email
            .into_iter()
            .filter(|e| !e.trim().is_empty())
            .collect(),
        phone: Field::from_opt(r.phone),
        location: Field::from_opt(r.location),
        rating: Field::from_opt(r.rating),
        review_count: Field::from_opt(r.review_count),
        verified: match r.verified {
            Some(true) => Verification::Verified,
            Some(false) => Verification::Unverified,
            None => Verification::Unknown,
        },
    }
}

/// Map a loose field row positionally into the canonical schema, truncating
/// anything past the 8 canonical columns.
fn degrade_fields(tag: SourceTag, fields: Vec<String>) -> Normalized {
    let reason = format!("loose field row ({} fields)", fields.len());
    warn!(%tag, reason, "degrading unrecognized record shape");

    let mut it = fields.into_iter().map(Some).chain(std::iter::repeat(None));
    let field = |v: Option<String>| Field::from_opt(v);

    let company_name = it
        .next()
        .flatten()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string());
    let website = field(it.next().flatten());
    let contact_emails: Vec<String> = it
        .next()
        .flatten()
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    let phone = field(it.next().flatten());
    let location = field(it.next().flatten());
    let rating = field(it.next().flatten());
    let review_count = field(it.next().flatten());
    let verified = match it.next().flatten().as_deref().map(str::to_lowercase) {
        Some(v) if v == "true" => Verification::Verified,
        Some(v) if v == "false" => Verification::Unverified,
        _ => Verification::Unknown,
    };

    Normalized::Degraded {
        record: NormalizedRecord {
            company_name,
            website,
            contact_emails,
            phone,
            location,
            rating,
            review_count,
            verified,
        },
        reason,
    }
}

/// A typed record arriving under the wrong tag: fall back to a single-field
/// record carrying the stringified raw value.
fn degrade_mismatch(tag: SourceTag, raw: RawRecord) -> Normalized {
    let reason = format!("source tag '{tag}' does not match record shape");
    warn!(%tag, ?raw, "degrading tag/shape mismatch");

    Normalized::Degraded {
        record: NormalizedRecord::bare(format!("{raw:?}")),
        reason,
    }
}
