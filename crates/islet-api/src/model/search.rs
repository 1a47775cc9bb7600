use serde::{Deserialize, Serialize};

/// One page of full-text search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The query that produced this page; stamped by the caller.
    pub query: String,
    /// Total number of hits for the query across all pages.
    pub query_hits: u32,
    /// 1-based page number; stamped by the caller.
    pub page: u32,
    pub hits: Vec<SearchHit>,
}

impl SearchResult {
    /// Attach the query and page this result answers.
    pub fn for_query(mut self, query: impl Into<String>, page: u32) -> Self {
        self.query = query.into();
        self.page = page;
        for hit in &mut self.hits {
            hit.page = page;
        }
        self
    }
}

/// A matching post. Every field defaults to empty: the search index is
/// sparse and a hit with holes is still worth showing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub now: String,
    pub time: String,
    pub sage: String,
    pub img: String,
    pub ext: String,
    pub title: String,
    pub resto: String,
    pub userid: String,
    pub email: String,
    pub content: String,
    pub page: u32,
}
