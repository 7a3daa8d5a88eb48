//! Review-site directory adapter.
//!
//! Scrapes a consumer-review directory: resolves the user's category against
//! the site's category index, walks the category listing page by page, and
//! parses each company's detail page for contact and trust data.
//!
//! The adapter deduplicates by company name within its own scrape and
//! filters by the requested review-count range before yielding records.
//! Pagination is sequential with a randomized delay between requests.

use std::collections::HashSet;
use std::time::Duration;

use rand::Rng;
use scraper::{Html, Selector};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use leadscout_shared::{LeadScoutError, RawRecord, Result, ReviewFilter, ReviewRaw, ReviewsConfig};

/// Directory pages render differently for non-browser agents; present a
/// plain browser identity.
const BROWSER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/92.0.4515.131 Safari/537.36";

// ---------------------------------------------------------------------------
// ReviewSiteClient
// ---------------------------------------------------------------------------

/// Handle on the review-site directory. Constructed once per process and
/// injected into the pipeline entry point.
#[derive(Debug, Clone)]
pub struct ReviewSiteClient {
    http: reqwest::Client,
    base_url: Url,
    min_delay_ms: u64,
    max_delay_ms: u64,
}

impl ReviewSiteClient {
    /// Create a client from the `[reviews]` config section.
    pub fn new(config: &ReviewsConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("en-US,en;q=0.9"),
        );

        let http = reqwest::Client::builder()
            .user_agent(BROWSER_AGENT)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LeadScoutError::Network(format!("failed to build HTTP client: {e}")))?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| LeadScoutError::config(format!("invalid reviews base_url: {e}")))?;

        Ok(Self {
            http,
            base_url,
            min_delay_ms: config.min_delay_ms,
            max_delay_ms: config.max_delay_ms,
        })
    }

    /// Search the directory with a structured filter and return raw records.
    ///
    /// Never fails past this boundary: category-resolution or page failures
    /// log the cause and return what was collected so far.
    #[instrument(skip(self), fields(category = %filter.category))]
    pub async fn search(&self, filter: &ReviewFilter) -> Vec<RawRecord> {
        let category_link = match self.resolve_category(&filter.category).await {
            Ok(Some(link)) => link,
            Ok(None) => {
                warn!(category = %filter.category, "no matching directory category");
                return Vec::new();
            }
            Err(e) => {
                error!(error = %e, "category index fetch failed");
                return Vec::new();
            }
        };

        let listing_url = match self.build_listing_url(&category_link, filter) {
            Ok(url) => url,
            Err(e) => {
                error!(error = %e, "listing URL construction failed");
                return Vec::new();
            }
        };

        self.walk_listing(&listing_url, filter).await
    }

    /// Fetch the category index and pick the best match for the request.
    async fn resolve_category(&self, category: &str) -> Result<Option<String>> {
        let url = self
            .base_url
            .join("/categories")
            .map_err(|e| LeadScoutError::parse(format!("category index URL: {e}")))?;

        let html = self.fetch_text(&url).await?;
        let links = parse_category_links(&html);
        debug!(count = links.len(), "category index parsed");

        Ok(best_category_match(&links, category))
    }

    fn build_listing_url(&self, category_link: &str, filter: &ReviewFilter) -> Result<Url> {
        let mut url = self
            .base_url
            .join(category_link)
            .map_err(|e| LeadScoutError::parse(format!("category link: {e}")))?;

        {
            let mut pairs = url.query_pairs_mut();
            if let Some(country) = &filter.country {
                pairs.append_pair("country", country);
            }
            if let Some(city) = &filter.city {
                pairs.append_pair("location", city);
            }
            if let Some(rating) = filter.rating {
                pairs.append_pair("trustscore", &rating.to_string());
            }
        }

        info!(url = %url, "constructed listing URL");
        Ok(url)
    }

    /// Walk the listing page by page until a page fails or lists no
    /// companies. Each company detail is fetched and parsed in turn.
    async fn walk_listing(&self, listing_url: &Url, filter: &ReviewFilter) -> Vec<RawRecord> {
        let (min_reviews, max_reviews) = filter.review_bounds();
        let mut records = Vec::new();
        let mut seen_companies: HashSet<String> = HashSet::new();
        let mut page_num: u32 = 1;

        loop {
            let mut paged_url = listing_url.clone();
            paged_url
                .query_pairs_mut()
                .append_pair("page", &page_num.to_string());

            self.random_delay().await;
            let html = match self.fetch_text(&paged_url).await {
                Ok(html) => html,
                Err(e) => {
                    error!(page = page_num, error = %e, "listing page fetch failed");
                    break;
                }
            };

            let cards = parse_company_cards(&html);
            info!(page = page_num, companies = cards.len(), "listing page parsed");
            if cards.is_empty() {
                break;
            }

            for card in cards {
                if seen_companies.contains(&card.name) {
                    debug!(company = %card.name, "duplicate within scrape, skipping");
                    continue;
                }

                let Some(detail) = self.fetch_company_detail(&card.href).await else {
                    continue;
                };

                let review_count = detail
                    .review_count
                    .as_deref()
                    .and_then(|c| c.parse::<u64>().ok())
                    .unwrap_or_else(|| {
                        warn!(company = %card.name, "unparseable review count, treating as 0");
                        0
                    });

                if review_count < min_reviews || review_count > max_reviews {
                    debug!(
                        company = %card.name,
                        review_count,
                        "review count outside requested range, skipping"
                    );
                    continue;
                }

                seen_companies.insert(card.name.clone());
                records.push(RawRecord::Review(ReviewRaw {
                    name: card.name,
                    ..detail
                }));
            }

            page_num += 1;
        }

        info!(count = records.len(), "review-site search complete");
        records
    }

    /// Fetch and parse one company detail page. Failures skip the company.
    async fn fetch_company_detail(&self, href: &str) -> Option<ReviewRaw> {
        let url = match self.base_url.join(href) {
            Ok(url) => url,
            Err(e) => {
                warn!(href, error = %e, "bad company link, skipping");
                return None;
            }
        };

        self.random_delay().await;
        match self.fetch_text(&url).await {
            Ok(html) => Some(parse_company_details(&html)),
            Err(e) => {
                warn!(url = %url, error = %e, "company page fetch failed, skipping");
                None
            }
        }
    }

    async fn fetch_text(&self, url: &Url) -> Result<String> {
        let response = self
            .http
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| LeadScoutError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LeadScoutError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| LeadScoutError::Network(format!("{url}: body read failed: {e}")))
    }

    /// Randomized pause between directory requests, per its rate etiquette.
    async fn random_delay(&self) {
        let ms = if self.max_delay_ms > self.min_delay_ms {
            rand::rng().random_range(self.min_delay_ms..=self.max_delay_ms)
        } else {
            self.min_delay_ms
        };
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

// ---------------------------------------------------------------------------
// HTML parsing
// ---------------------------------------------------------------------------

/// One entry of the directory's category index.
#[derive(Debug, Clone, PartialEq)]
struct CategoryLink {
    title: String,
    href: String,
}

/// One company card on a listing page.
#[derive(Debug, Clone, PartialEq)]
struct CompanyCard {
    name: String,
    href: String,
}

fn parse_category_links(html: &str) -> Vec<CategoryLink> {
    let doc = Html::parse_document(html);
    let link_sel = Selector::parse(r#"a[href*="/categories/"]"#).unwrap();

    let mut links = Vec::new();
    for el in doc.select(&link_sel) {
        let title = el.text().collect::<String>().trim().to_string();
        let href = el.value().attr("href").unwrap_or("").to_string();
        if !title.is_empty() && !href.is_empty() {
            links.push(CategoryLink { title, href });
        }
    }
    links
}

/// Keyword-overlap match: the category whose title shares the most words
/// with the request wins.
fn best_category_match(links: &[CategoryLink], category: &str) -> Option<String> {
    let key_words: Vec<String> = category
        .to_lowercase()
        .split_whitespace()
        .map(String::from)
        .collect();
    if key_words.is_empty() {
        return None;
    }

    let mut best: Option<&CategoryLink> = None;
    let mut best_score = 0usize;

    for link in links {
        let title = link.title.to_lowercase();
        let score = key_words.iter().filter(|w| title.contains(w.as_str())).count();
        if score > best_score {
            best_score = score;
            best = Some(link);
        }
    }

    best.map(|link| {
        info!(category, matched = %link.title, "resolved directory category");
        link.href.clone()
    })
}

fn parse_company_cards(html: &str) -> Vec<CompanyCard> {
    let doc = Html::parse_document(html);
    let card_sel = Selector::parse(r#"a[name="business-unit-card"]"#).unwrap();
    let name_sel = Selector::parse(r#"p[class*="typography_heading-xs"]"#).unwrap();

    let mut cards = Vec::new();
    for card in doc.select(&card_sel) {
        let Some(href) = card.value().attr("href") else {
            continue;
        };
        let Some(name_el) = card.select(&name_sel).next() else {
            continue;
        };
        let name = clean_company_name(&name_el.text().collect::<String>());
        if !name.is_empty() {
            cards.push(CompanyCard {
                name,
                href: href.to_string(),
            });
        }
    }
    cards
}

/// Strip domain-suffix noise the directory appends to display names.
fn clean_company_name(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches(".com").trim_end_matches(".ai");
    let mut chars = trimmed.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Parse a company detail page into a raw record (name filled by the caller
/// from the listing card).
fn parse_company_details(html: &str) -> ReviewRaw {
    let doc = Html::parse_document(html);

    let email_sel = Selector::parse(r#"a[href^="mailto:"]"#).unwrap();
    let email = doc
        .select(&email_sel)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(|href| href.trim_start_matches("mailto:").to_string());

    let rating_sel = Selector::parse(r#"p[data-rating-typography="true"]"#).unwrap();
    let rating = doc
        .select(&rating_sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string());

    let phone_sel = Selector::parse(r#"a[href^="tel:"]"#).unwrap();
    let phone = doc
        .select(&phone_sel)
        .next()
        .map(|el| clean_phone_number(&el.text().collect::<String>()))
        .filter(|p| !p.is_empty());

    let location_sel = Selector::parse(r#"ul[class*="contactInfoAddressList"] li"#).unwrap();
    let location_parts: Vec<String> = doc
        .select(&location_sel)
        .map(|el| el.text().collect::<String>().replace(',', "").trim().to_string())
        .filter(|part| !part.is_empty())
        .collect();
    let location = if location_parts.is_empty() {
        None
    } else {
        Some(location_parts.join(", "))
    };

    let verification_sel = Selector::parse(r#"button[class*="verificationLabel"]"#).unwrap();
    let verified = Some(doc.select(&verification_sel).next().is_some());

    let website_sel = Selector::parse(r#"a[class*="link_internal"][href]"#).unwrap();
    let website = doc
        .select(&website_sel)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(String::from);

    let count_sel = Selector::parse(r#"span[class*="styles_text"]"#).unwrap();
    let review_count = doc
        .select(&count_sel)
        .next()
        .map(|el| el.text().collect::<String>())
        .and_then(|text| extract_review_count(&text))
        .or_else(|| Some("0".to_string()));

    ReviewRaw {
        name: String::new(),
        rating,
        email,
        phone,
        location,
        verified,
        website,
        review_count,
    }
}

/// Pull the digit run out of a "1,234 total reviews" style label.
fn extract_review_count(text: &str) -> Option<String> {
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',')
        .collect();
    let cleaned = digits.replace(',', "");
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

fn clean_phone_number(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}
