//! Solr cursor source
//!
//! Walks a collection with `cursorMark` pagination. Each request runs on a
//! background task that hands pages over a bounded channel, so the next fetch
//! overlaps with the dispatch of the previous page.

use async_trait::async_trait;
use futures::stream;
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::{Credentials, DumpConfig};
use crate::connection::{build_http_client, Endpoint};
use crate::error::{QueryError, Result, SourceError};

use super::query::{QueryParams, SortSpec};
use super::{Document, Page, PageResult, PageSource, PageStream};

/// Cursor value that starts a new walk
const CURSOR_START: &str = "*";

/// Longest response body kept in an error message
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Deserialize)]
struct SelectResponse {
    #[serde(default)]
    response: Option<ResultBody>,
    #[serde(rename = "nextCursorMark", default)]
    next_cursor_mark: Option<String>,
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ResultBody {
    #[serde(rename = "numFound", default)]
    num_found: u64,
    #[serde(default)]
    docs: Vec<Document>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UniqueKeyResponse {
    #[serde(rename = "uniqueKey")]
    unique_key: String,
}

/// One decoded cursor page
#[derive(Debug, PartialEq)]
struct CursorPage {
    num_found: u64,
    docs: Vec<Document>,
    next_cursor_mark: String,
}

/// Cursor-paginated source over one Solr collection
#[derive(Debug, Clone)]
pub struct SolrCursorSource {
    client: Client,
    endpoint: Endpoint,
    params: QueryParams,
    sort: SortSpec,
    credentials: Option<Credentials>,
    channel_capacity: usize,
}

impl SolrCursorSource {
    /// Create a source for the run described by `config`
    pub fn new(config: &DumpConfig) -> Result<Self> {
        let client = build_http_client(config.http_timeout)?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            params: QueryParams::from_spec(&config.query),
            sort: config.query.sort.clone(),
            credentials: config.credentials.clone(),
            channel_capacity: config.channel_capacity.max(1),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(c) => request.basic_auth(&c.user, c.password.as_ref()),
            None => request,
        }
    }

    /// Ask the collection for its unique key field
    async fn fetch_unique_key(&self) -> std::result::Result<String, SourceError> {
        let url = self
            .endpoint
            .handler_url("schema/uniquekey")
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        let request = self.authorize(self.client.get(url).query(&[("wt", "json")]));
        let (status, body) = send(request).await?;
        if !(200..300).contains(&status) {
            return Err(status_error(status, &body));
        }
        serde_json::from_slice::<UniqueKeyResponse>(&body)
            .map(|r| r.unique_key)
            .map_err(|e| SourceError::Decode(e.to_string()))
    }

    async fn fetch_page(
        &self,
        url: &Url,
        cursor: &str,
    ) -> std::result::Result<CursorPage, SourceError> {
        let request = self.authorize(
            self.client
                .get(url.clone())
                .query(&self.params.pairs())
                .query(&[("wt", "json"), ("cursorMark", cursor)]),
        );
        let (status, body) = send(request).await?;
        parse_select_response(status, &body)
    }

    /// Fetch pages until the cursor stops moving or the consumer goes away
    async fn run(self, tx: mpsc::Sender<PageResult>) {
        let url = match self.endpoint.handler_url("select") {
            Ok(url) => url,
            Err(e) => {
                let _ = tx
                    .send(PageResult::Error(SourceError::Transport(e.to_string())))
                    .await;
                return;
            }
        };

        let mut cursor = CURSOR_START.to_string();
        let mut fetched = 0u64;

        loop {
            debug!("Requesting page with cursorMark {}", cursor);

            let page = match self.fetch_page(&url, &cursor).await {
                Ok(page) => page,
                Err(e) => {
                    // Without a nextCursorMark the walk cannot continue.
                    let _ = tx.send(PageResult::Error(e)).await;
                    return;
                }
            };

            if cursor == CURSOR_START {
                info!("{} documents match the query", page.num_found);
            }

            let finished = page.docs.is_empty() || page.next_cursor_mark == cursor;
            fetched += page.docs.len() as u64;

            if !page.docs.is_empty() {
                let result = PageResult::Page(Page::new(page.docs));
                if tx.send(result).await.is_err() {
                    debug!("Consumer closed the stream after {} documents", fetched);
                    return;
                }
            }

            if finished {
                debug!("Cursor exhausted after {} documents", fetched);
                return;
            }
            cursor = page.next_cursor_mark;
        }
    }
}

#[async_trait]
impl PageSource for SolrCursorSource {
    async fn prepare(&mut self) -> Result<()> {
        let unique_key = self
            .fetch_unique_key()
            .await
            .map_err(|e| QueryError::Setup(format!("cannot read the unique key: {e}")))?;

        debug!("Collection {} unique key: {}", self.endpoint.collection, unique_key);

        if !self.sort.references(&unique_key) {
            return Err(QueryError::SortMissingUniqueKey {
                sort: self.sort.to_string(),
                unique_key,
            }
            .into());
        }
        Ok(())
    }

    fn into_stream(self: Box<Self>) -> PageStream {
        let source = *self;
        let (tx, rx) = mpsc::channel(source.channel_capacity);
        tokio::spawn(source.run(tx));

        Box::pin(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|result| (result, rx))
        }))
    }
}

async fn send(request: RequestBuilder) -> std::result::Result<(u16, Vec<u8>), SourceError> {
    let response = request
        .send()
        .await
        .map_err(|e| SourceError::Transport(e.to_string()))?;
    let status = response.status().as_u16();
    let body = response
        .bytes()
        .await
        .map_err(|e| SourceError::Transport(e.to_string()))?;
    Ok((status, body.to_vec()))
}

/// Map a non-success answer to an error, preferring Solr's own message
fn status_error(status: u16, body: &[u8]) -> SourceError {
    if let Ok(SelectResponse {
        error: Some(err), ..
    }) = serde_json::from_slice::<SelectResponse>(body)
    {
        return SourceError::Service {
            code: err.code,
            message: err.msg.unwrap_or_else(|| format!("HTTP status {status}")),
        };
    }

    let mut text = String::from_utf8_lossy(body).into_owned();
    if text.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
    }
    SourceError::HttpStatus { status, body: text }
}

fn parse_select_response(status: u16, body: &[u8]) -> std::result::Result<CursorPage, SourceError> {
    if !(200..300).contains(&status) {
        return Err(status_error(status, body));
    }

    let decoded: SelectResponse =
        serde_json::from_slice(body).map_err(|e| SourceError::Decode(e.to_string()))?;

    if let Some(err) = decoded.error {
        return Err(SourceError::Service {
            code: err.code,
            message: err.msg.unwrap_or_default(),
        });
    }

    let result = decoded
        .response
        .ok_or_else(|| SourceError::Decode("missing \"response\" section".to_string()))?;
    let next_cursor_mark = decoded
        .next_cursor_mark
        .ok_or_else(|| SourceError::Decode("missing \"nextCursorMark\"".to_string()))?;

    Ok(CursorPage {
        num_found: result.num_found,
        docs: result.docs,
        next_cursor_mark,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_select_response() {
        let body = br#"{
            "responseHeader": {"status": 0},
            "response": {"numFound": 2, "start": 0, "docs": [
                {"id": "b", "_version_": 1},
                {"id": "a", "_version_": 2}
            ]},
            "nextCursorMark": "AoE"
        }"#;
        let page = parse_select_response(200, body).unwrap();
        assert_eq!(page.num_found, 2);
        assert_eq!(page.docs.len(), 2);
        assert_eq!(page.docs[0]["id"], "b");
        assert_eq!(page.next_cursor_mark, "AoE");
    }

    #[test]
    fn test_parse_solr_error_body() {
        let body = br#"{"error": {"code": 400, "msg": "Cursor functionality requires a sort containing a uniqueKey field tie breaker"}}"#;
        let err = parse_select_response(400, body).unwrap_err();
        assert!(matches!(err, SourceError::Service { code: Some(400), .. }));
    }

    #[test]
    fn test_parse_plain_http_error() {
        let err = parse_select_response(503, b"Service Unavailable").unwrap_err();
        assert_eq!(
            err,
            SourceError::HttpStatus {
                status: 503,
                body: "Service Unavailable".into()
            }
        );
    }

    #[test]
    fn test_parse_missing_cursor_mark() {
        let body = br#"{"response": {"numFound": 0, "docs": []}}"#;
        assert!(matches!(
            parse_select_response(200, body),
            Err(SourceError::Decode(_))
        ));
    }

    #[test]
    fn test_long_error_body_is_truncated() {
        let body = "x".repeat(MAX_ERROR_BODY * 2);
        match status_error(500, body.as_bytes()) {
            SourceError::HttpStatus { body, .. } => assert_eq!(body.len(), MAX_ERROR_BODY),
            other => panic!("unexpected {other:?}"),
        }
    }
}
