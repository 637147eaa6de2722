//! Query/batch value types and the suggestion channel wire format.
//!
//! ## Wire format
//!
//! | Direction | JSON                                              |
//! |-----------|---------------------------------------------------|
//! | Outbound  | `{"prefix": "gol", "limit": 5}` (+ `"seq"`)       |
//! | Inbound   | `{"suggestions": ["golang", "gopher"]}` (+ `"seq"`) |
//!
//! `seq` is only written when sequence correlation is enabled. Some
//! services encode an empty result as `"suggestions": null`, which decodes to
//! an empty batch.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TypeaheadError};

// ---------------------------------------------------------------------------
// Value types
// ---------------------------------------------------------------------------

/// A query dispatched to the suggestion service.
///
/// Created when a debounce window elapses; `seq` is strictly increasing
/// within a session and never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
    seq: u64,
}

impl Query {
    pub(crate) fn new(text: String, seq: u64) -> Self {
        Self { text, seq }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Which query a batch answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correlation {
    /// The batch echoes the sequence number of its query.
    Sequence(u64),
    /// No correlation on the wire; the batch answers "the latest query".
    Latest,
}

impl std::fmt::Display for Correlation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Correlation::Sequence(seq) => write!(f, "seq {}", seq),
            Correlation::Latest => write!(f, "latest"),
        }
    }
}

/// An ordered set of suggestions from the service.
///
/// Item order is the service's rank order and is preserved for display and
/// keyboard traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionBatch {
    pub items: Vec<String>,
    pub correlation: Correlation,
}

impl SuggestionBatch {
    pub fn latest(items: Vec<String>) -> Self {
        Self {
            items,
            correlation: Correlation::Latest,
        }
    }

    pub fn for_seq(seq: u64, items: Vec<String>) -> Self {
        Self {
            items,
            correlation: Correlation::Sequence(seq),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Wire messages
// ---------------------------------------------------------------------------

/// Outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionRequest {
    pub prefix: String,
    pub limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

impl SuggestionRequest {
    /// Build the request for a query. `correlate` controls whether `seq` is sent.
    pub fn for_query(query: &Query, limit: u32, correlate: bool) -> Self {
        Self {
            prefix: query.text().to_string(),
            limit,
            seq: correlate.then_some(query.seq()),
        }
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionResponse {
    /// Required key; `null` means no suggestions.
    #[serde(deserialize_with = "required_nullable")]
    pub suggestions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

impl SuggestionResponse {
    /// Decode an inbound text frame into a batch.
    pub fn decode(text: &str) -> Result<SuggestionBatch> {
        let response: SuggestionResponse =
            serde_json::from_str(text).map_err(TypeaheadError::malformed)?;
        Ok(response.into_batch())
    }

    pub fn into_batch(self) -> SuggestionBatch {
        let items = self.suggestions.unwrap_or_default();
        match self.seq {
            Some(seq) => SuggestionBatch::for_seq(seq, items),
            None => SuggestionBatch::latest(items),
        }
    }
}

// A plain `Option` field would accept a missing key as `None`.
fn required_nullable<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<Vec<String>>::deserialize(deserializer)
}
