/// Item autofill from product page metadata
///
/// Fetches a user-supplied URL and extracts Open Graph / meta tags to
/// pre-populate an item form. Every failure degrades to a partial or empty
/// result; the caller's session never sees a fetch error.

use crate::config::AutofillConfig;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use url::Url;

/// Extracted page metadata; all fields are best-effort
///
/// `success` is false when the page could not be fetched at all; extraction
/// gaps on a fetched page still count as success.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutofillResult {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<f64>,
    pub success: bool,
    pub error_message: Option<String>,
}

impl AutofillResult {
    fn failed(message: &str) -> Self {
        Self {
            success: false,
            error_message: Some(message.to_string()),
            ..Self::default()
        }
    }
}

/// Metadata fetcher service
pub struct MetadataFetcher {
    client: reqwest::Client,
}

impl MetadataFetcher {
    pub fn new(config: &AutofillConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .user_agent("Mozilla/5.0 (compatible; GiftwishBot/1.0)")
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .unwrap_or_default();

        Self { client }
    }

    /// Fetch a page and extract item metadata
    pub async fn fetch(&self, raw_url: &str) -> AutofillResult {
        let url = match Url::parse(raw_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            _ => {
                tracing::debug!(url = raw_url, "autofill rejected non-http url");
                return AutofillResult::failed("URL must be http or https");
            }
        };

        if !self.is_public_host(&url).await {
            tracing::warn!(url = raw_url, "autofill rejected non-public host");
            return AutofillResult::failed("Host is not reachable");
        }

        let body = match self.client.get(url.clone()).send().await {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(url = raw_url, "autofill body read failed: {}", e);
                    return AutofillResult::failed("Failed to read page body");
                }
            },
            Ok(response) => {
                tracing::debug!(url = raw_url, status = %response.status(), "autofill fetch rejected");
                return AutofillResult::failed("Page returned an error status");
            }
            Err(e) => {
                tracing::debug!(url = raw_url, "autofill fetch failed: {}", e);
                return AutofillResult::failed("Failed to fetch page");
            }
        };

        extract_metadata(&body)
    }

    /// Resolve the host and reject loopback, private, and link-local targets
    async fn is_public_host(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let port = url.port_or_known_default().unwrap_or(443);

        let addrs = match tokio::net::lookup_host((host, port)).await {
            Ok(addrs) => addrs.collect::<Vec<SocketAddr>>(),
            Err(_) => return false,
        };

        !addrs.is_empty() && addrs.iter().all(|addr| is_public_ip(addr.ip()))
    }
}

fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast())
        }
        IpAddr::V6(v6) => {
            // Unique-local fc00::/7 and link-local fe80::/10
            !(v6.is_loopback()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80)
        }
    }
}

/// Pull item fields out of the document's meta tags
fn extract_metadata(body: &str) -> AutofillResult {
    let document = Html::parse_document(body);

    let title = meta_content(&document, "og:title")
        .or_else(|| meta_content(&document, "twitter:title"))
        .or_else(|| element_text(&document, "title"));
    let description = meta_content(&document, "og:description")
        .or_else(|| meta_content(&document, "twitter:description"))
        .or_else(|| meta_name_content(&document, "description"));
    let image_url = meta_content(&document, "og:image")
        .or_else(|| meta_content(&document, "twitter:image"));
    let price = meta_content(&document, "product:price:amount")
        .or_else(|| meta_content(&document, "og:price:amount"))
        .and_then(|raw| parse_price(&raw));

    AutofillResult {
        title,
        description,
        image_url,
        price,
        success: true,
        error_message: None,
    }
}

fn meta_content(document: &Html, property: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"meta[property="{}"]"#, property)).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn meta_name_content(document: &Html, name: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"meta[name="{}"]"#, name)).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn element_text(document: &Html, tag: &str) -> Option<String> {
    let selector = Selector::parse(tag).ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse a price string, tolerating currency symbols and thousands separators
fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();

    // "1,299.99" keeps the dot as the decimal point; "49,99" treats the
    // comma as one.
    let normalized = if cleaned.contains('.') {
        cleaned.replace(',', "")
    } else {
        cleaned.replace(',', ".")
    };

    normalized.parse::<f64>().ok().filter(|p| *p > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_graph_tags_are_extracted() {
        let html = r#"<html><head>
            <title>Fallback Title</title>
            <meta property="og:title" content="Wireless Headphones" />
            <meta property="og:description" content="Noise cancelling." />
            <meta property="og:image" content="https://cdn.example.com/hp.jpg" />
            <meta property="product:price:amount" content="199.99" />
        </head><body></body></html>"#;

        let meta = extract_metadata(html);
        assert_eq!(meta.title.as_deref(), Some("Wireless Headphones"));
        assert!(meta.success);
        assert_eq!(meta.description.as_deref(), Some("Noise cancelling."));
        assert_eq!(meta.image_url.as_deref(), Some("https://cdn.example.com/hp.jpg"));
        assert_eq!(meta.price, Some(199.99));
    }

    #[test]
    fn falls_back_to_title_and_meta_description() {
        let html = r#"<html><head>
            <title>  Plain Product Page  </title>
            <meta name="description" content="A plain description." />
        </head><body></body></html>"#;

        let meta = extract_metadata(html);
        assert_eq!(meta.title.as_deref(), Some("Plain Product Page"));
        assert_eq!(meta.description.as_deref(), Some("A plain description."));
        assert!(meta.image_url.is_none());
        assert!(meta.price.is_none());
    }

    #[test]
    fn empty_document_yields_empty_metadata() {
        let meta = extract_metadata("not even html");
        assert!(meta.title.is_none());
        assert!(meta.price.is_none());
        assert!(meta.success);
    }

    #[test]
    fn price_parsing_handles_common_formats() {
        assert_eq!(parse_price("199.99"), Some(199.99));
        assert_eq!(parse_price("$1,299.99"), Some(1299.99));
        assert_eq!(parse_price("49,99 €"), Some(49.99));
        assert_eq!(parse_price("free"), None);
        assert_eq!(parse_price("0"), None);
    }

    #[test]
    fn private_and_loopback_addresses_are_rejected() {
        assert!(!is_public_ip("127.0.0.1".parse().unwrap()));
        assert!(!is_public_ip("10.0.0.5".parse().unwrap()));
        assert!(!is_public_ip("192.168.1.1".parse().unwrap()));
        assert!(!is_public_ip("169.254.1.1".parse().unwrap()));
        assert!(!is_public_ip("::1".parse().unwrap()));
        assert!(!is_public_ip("fe80::1".parse().unwrap()));
        assert!(is_public_ip("93.184.216.34".parse().unwrap()));
        assert!(is_public_ip("2606:2800:220:1::1".parse().unwrap()));
    }
}
