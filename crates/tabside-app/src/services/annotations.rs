//! Annotation count port

use tabside_core::prelude::*;
use url::Url;

/// Fetches the number of public annotations for a page
#[trait_variant::make(AnnotationCountPort: Send)]
pub trait LocalAnnotationCountPort {
    /// Count annotations on `url` using the service at `api_url`
    async fn fetch_count(&self, url: &str, api_url: &str) -> Result<u64>;
}

/// Only web pages have annotation counts; browser-internal, `file:` and
/// `data:` URLs are never sent to the service
pub fn is_countable_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.has_host(),
        Err(_) => false,
    }
}
