//! Static asset manifest and request classification.
//!
//! The default [`MatchMode::Substring`] reports a URL as static when any
//! manifest entry occurs anywhere in it. This admits false positives (a
//! manifest containing `/` matches every URL); [`MatchMode::ExactPath`] is an
//! explicit opt-in for path equality instead.

use serde::{Deserialize, Serialize};
use url::Url;

/// How URLs are compared against manifest entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Entry is contained anywhere in the full URL string.
    #[default]
    Substring,
    /// Entry equals the URL path (query ignored).
    ExactPath,
}

/// Ordered list of relative paths pre-cached at install time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticManifest {
    paths: Vec<String>,
    mode: MatchMode,
}

impl StaticManifest {
    pub fn new(paths: Vec<String>) -> Self {
        Self { paths, mode: MatchMode::default() }
    }

    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Whether a resolved URL names a static asset.
    pub fn is_static(&self, url: &Url) -> bool {
        match self.mode {
            MatchMode::Substring => {
                let url = url.as_str();
                self.paths.iter().any(|path| url.contains(path.as_str()))
            }
            MatchMode::ExactPath => self.paths.iter().any(|path| url.path() == path),
        }
    }
}
