//! Page sources for dump operations
//!
//! A source yields, in order, either a [`Page`] of documents or a
//! [`SourceError`], and closes its stream when the result set is exhausted.
//! The dump coordinator only sees the [`PageStream`]; how pagination tokens are
//! managed stays inside the source.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::{Result, SourceError};

pub mod query;
pub mod solr;

pub use query::{QueryParams, QuerySpec, SortClause, SortDirection, SortSpec};
pub use solr::SolrCursorSource;

/// One document: field name to JSON value, in the order the service sent them
pub type Document = serde_json::Map<String, serde_json::Value>;

/// One batch of documents returned by a single fetch
///
/// A page has no identity of its own; the coordinator numbers it on arrival.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    documents: Vec<Document>,
}

impl Page {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn into_documents(self) -> Vec<Document> {
        self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// One item of the result stream
#[derive(Debug)]
pub enum PageResult {
    Page(Page),
    Error(SourceError),
}

/// Boxed stream of results as consumed by the coordinator
pub type PageStream = Pin<Box<dyn Stream<Item = PageResult> + Send>>;

/// Trait for producers of paginated result sets
#[async_trait]
pub trait PageSource: Send {
    /// Check the query against the service before any page is requested
    ///
    /// # Returns
    /// * `Result<()>` - Ok when the stream can be started
    async fn prepare(&mut self) -> Result<()>;

    /// Start producing results
    fn into_stream(self: Box<Self>) -> PageStream;
}
