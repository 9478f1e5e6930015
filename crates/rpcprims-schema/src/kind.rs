use std::fmt;

use serde::{Deserialize, Serialize};

/// Calling convention of an endpoint method.
///
/// Query and Mutation are unary: one request, one response. Stream produces
/// a finite sequence of results and accepts a cancellation signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    Query,
    Mutation,
    Stream,
}

impl MethodKind {
    /// Lowercase name as it appears in schema documents.
    pub fn as_str(self) -> &'static str {
        match self {
            MethodKind::Query => "query",
            MethodKind::Mutation => "mutation",
            MethodKind::Stream => "stream",
        }
    }

    /// True for methods that produce a sequence of results.
    pub fn is_streaming(self) -> bool {
        match self {
            MethodKind::Query | MethodKind::Mutation => false,
            MethodKind::Stream => true,
        }
    }
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
