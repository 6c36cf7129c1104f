//! Storage and versioning backends under benchmark.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One pluggable backend whose upload path is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Technology {
    /// Plain object storage.
    S3,
    /// Content-addressed store through its Python-style filesystem API.
    Pyxet,
    /// Content-addressed store through its git extension.
    Gitxet,
    /// Git LFS backed by a git hosting provider.
    LfsGit,
    /// Git LFS backed by an object store.
    LfsS3,
    /// Lake storage layer with branch semantics.
    #[serde(rename = "lakefs")]
    LakeFs,
    /// Data version control tool.
    Dvc,
    /// Local merge of a fresh file into the cumulative file.
    Merge,
}

impl Technology {
    /// Every known technology, in the default invocation order.
    pub const ALL: [Technology; 8] = [
        Self::Pyxet,
        Self::S3,
        Self::Gitxet,
        Self::LakeFs,
        Self::LfsGit,
        Self::LfsS3,
        Self::Dvc,
        Self::Merge,
    ];

    /// Stable wire name used in the ledger and on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::S3 => "s3",
            Self::Pyxet => "pyxet",
            Self::Gitxet => "gitxet",
            Self::LfsGit => "lfs-git",
            Self::LfsS3 => "lfs-s3",
            Self::LakeFs => "lakefs",
            Self::Dvc => "dvc",
            Self::Merge => "merge",
        }
    }

    /// Whether this technology uploads a file somewhere, as opposed to
    /// an internal step like merging.
    #[must_use]
    pub fn is_upload(self) -> bool {
        !matches!(self, Self::Merge)
    }

    /// Upload technologies in default order; what "all technologies" means
    /// when a workflow does not name any.
    pub fn uploads() -> impl Iterator<Item = Technology> {
        Self::ALL.into_iter().filter(|t| t.is_upload())
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Technology {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("technology", s))
    }
}

/// Returned when a wire name does not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    #[must_use]
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for ParseEnumError {}
