//! Connection management for Solr
//!
//! This module provides:
//! - Parsing and validation of collection links into a typed [`Endpoint`]
//! - Construction of the shared HTTP client used by the cursor source

use std::fmt;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Url};

use crate::error::{EndpointError, QueryError};

/// Path segment every collection link must start with.
const SOLR_SEGMENT: &str = "solr";

/// A validated link to one Solr collection
///
/// Format: `http[s]://host[:port]/solr/<collection>[/]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// `http` or `https`
    pub scheme: String,

    /// Host name or address, without port
    pub host: String,

    /// Explicit non-default port, if any
    pub port: Option<u16>,

    /// Collection name taken from the path
    pub collection: String,

    /// Normalized collection base URL, always ending with `/`
    url: Url,
}

impl Endpoint {
    /// Parse a collection link
    ///
    /// # Arguments
    /// * `link` - Link like `http://solr1:8983/solr/products`
    ///
    /// # Returns
    /// * `Result<Endpoint, EndpointError>` - Typed endpoint or the specific failure
    pub fn parse(link: &str) -> Result<Self, EndpointError> {
        let url = Url::parse(link.trim()).map_err(|e| EndpointError::Unparseable {
            link: link.to_string(),
            reason: e.to_string(),
        })?;

        let scheme = url.scheme().to_string();
        if scheme != "http" && scheme != "https" {
            return Err(EndpointError::UnsupportedScheme(scheme));
        }

        let host = match url.host_str() {
            Some(h) if !h.is_empty() => h.to_string(),
            _ => return Err(EndpointError::MissingHost),
        };

        if let Some(query) = url.query() {
            return Err(EndpointError::UnexpectedPath(format!("?{query}")));
        }
        if let Some(fragment) = url.fragment() {
            return Err(EndpointError::UnexpectedPath(format!("#{fragment}")));
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.collect())
            .unwrap_or_default();

        let collection = match segments.as_slice() {
            [solr, ..] if *solr != SOLR_SEGMENT => return Err(EndpointError::MissingSolrSegment),
            [] => return Err(EndpointError::MissingSolrSegment),
            [_] | [_, ""] => return Err(EndpointError::MissingCollection),
            [_, name] | [_, name, ""] => *name,
            [_, _, rest @ ..] => return Err(EndpointError::UnexpectedPath(rest.join("/"))),
        };

        if !is_valid_collection_name(collection) {
            return Err(EndpointError::InvalidCollectionName(collection.to_string()));
        }

        let mut base = url.clone();
        base.set_path(&format!("/{SOLR_SEGMENT}/{collection}/"));

        Ok(Self {
            scheme,
            host,
            port: url.port(),
            collection: collection.to_string(),
            url: base,
        })
    }

    /// URL of a handler relative to the collection, e.g. `select`
    pub fn handler_url(&self, handler: &str) -> Result<Url, QueryError> {
        self.url
            .join(handler)
            .map_err(|e| QueryError::Setup(format!("cannot build URL for {handler}: {e}")))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

fn is_valid_collection_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// User agent sent with every request
pub fn user_agent() -> String {
    format!(
        "solrdump/{} ({})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    )
}

/// Build the HTTP client shared by all requests of one run
///
/// # Arguments
/// * `timeout` - Per-request timeout
///
/// # Returns
/// * `Result<Client, QueryError>` - Configured client or setup error
pub fn build_http_client(timeout: Duration) -> Result<Client, QueryError> {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));

    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent())
        .default_headers(headers)
        .gzip(true)
        .deflate(true)
        .build()
        .map_err(|e| QueryError::Setup(format!("cannot build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_port() {
        let ep = Endpoint::parse("http://solr1.local:8983/solr/products").unwrap();
        assert_eq!(ep.scheme, "http");
        assert_eq!(ep.host, "solr1.local");
        assert_eq!(ep.port, Some(8983));
        assert_eq!(ep.collection, "products");
        assert_eq!(ep.to_string(), "http://solr1.local:8983/solr/products/");
    }

    #[test]
    fn test_parse_trailing_slash_and_no_port() {
        let ep = Endpoint::parse("https://search/solr/my_coll.v2-1/").unwrap();
        assert_eq!(ep.port, None);
        assert_eq!(ep.collection, "my_coll.v2-1");
        assert_eq!(ep.to_string(), "https://search/solr/my_coll.v2-1/");
    }

    #[test]
    fn test_handler_url() {
        let ep = Endpoint::parse("http://h:8983/solr/c").unwrap();
        let url = ep.handler_url("schema/uniquekey").unwrap();
        assert_eq!(url.as_str(), "http://h:8983/solr/c/schema/uniquekey");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Endpoint::parse("solr/products"),
            Err(EndpointError::Unparseable { .. })
        ));
        assert_eq!(
            Endpoint::parse("ftp://h/solr/c"),
            Err(EndpointError::UnsupportedScheme("ftp".into()))
        );
        assert_eq!(
            Endpoint::parse("http://h:8983/search/c"),
            Err(EndpointError::MissingSolrSegment)
        );
        assert_eq!(
            Endpoint::parse("http://h:8983/"),
            Err(EndpointError::MissingSolrSegment)
        );
        assert_eq!(
            Endpoint::parse("http://h:8983/solr/"),
            Err(EndpointError::MissingCollection)
        );
        assert_eq!(
            Endpoint::parse("http://h:8983/solr/c/select"),
            Err(EndpointError::UnexpectedPath("select".into()))
        );
        assert_eq!(
            Endpoint::parse("http://h/solr/bad%20name"),
            Err(EndpointError::InvalidCollectionName("bad%20name".into()))
        );
        assert_eq!(
            Endpoint::parse("http://h/solr/c?q=x"),
            Err(EndpointError::UnexpectedPath("?q=x".into()))
        );
    }

    #[test]
    fn test_user_agent() {
        assert!(user_agent().starts_with("solrdump/"));
    }
}
