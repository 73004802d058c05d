//! Front-matter extraction and parsing.
//!
//! A page starts with a fenced block whose opening fence carries the format
//! of the metadata:
//!
//! ````text
//! ```json
//! {"title": "About", "created_at": "2021-05-26"}
//! ```
//! # About
//! ````
//!
//! [`read`] consumes exactly the front-matter lines, so the reader can be
//! used afterwards to read the page body.

use std::io::BufRead;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Fence delimiting front-matter blocks.
pub const FENCE: &str = "```";

/// Parsed front-matter of a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    /// Author of the page.
    pub author: String,

    /// Page title, also used to derive the output filename.
    pub title: String,

    /// Short abstract of the page.
    pub description: String,

    /// Day the page was written.
    pub created_at: Option<NaiveDate>,

    /// Words categorizing the page.
    pub tags: Vec<String>,

    /// Excludes the page from navigation menus, list pages and feeds.
    pub hidden: bool,
}

/// Encoding of a front-matter block, selected by the opening fence's tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Parse the format tag following the opening fence.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// Errors that can occur when reading front-matter.
#[derive(Debug, thiserror::Error)]
pub enum FrontmatterError {
    #[error("no front-matter")]
    NoFrontMatter,

    #[error("unsupported front-matter format {0:?}")]
    UnsupportedFormat(String),

    #[error("bad front-matter: input ended before the closing fence")]
    Incomplete,

    #[error("bad front-matter: {0}")]
    Malformed(String),

    #[error("reading front-matter failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Read a front-matter block from `reader` and decode it into `T`.
///
/// Reading stops right after the closing fence, leaving the remaining bytes
/// of the document in `reader`.
pub fn read<T, R>(reader: &mut R) -> Result<T, FrontmatterError>
where
    T: DeserializeOwned,
    R: BufRead + ?Sized,
{
    let mut format: Option<String> = None;
    let mut data = String::new();
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(FrontmatterError::Incomplete);
        }

        let opened = format.is_some();
        if line.trim() == FENCE {
            if opened {
                break;
            }
            return Err(FrontmatterError::UnsupportedFormat(String::new()));
        }
        if !opened && !line.starts_with(FENCE) {
            return Err(FrontmatterError::NoFrontMatter);
        }
        // Only a closing fence may end the input without a newline.
        if !line.ends_with('\n') {
            return Err(FrontmatterError::Incomplete);
        }

        if opened {
            data.push_str(&line);
        } else {
            format = Some(line[FENCE.len()..].trim().to_owned());
        }
    }

    let tag = format.unwrap_or_default();
    match Format::from_tag(&tag) {
        Some(Format::Json) => {
            serde_json::from_str(&data).map_err(|e| FrontmatterError::Malformed(e.to_string()))
        }
        Some(Format::Yaml) => {
            serde_yaml::from_str(&data).map_err(|e| FrontmatterError::Malformed(e.to_string()))
        }
        None => Err(FrontmatterError::UnsupportedFormat(tag)),
    }
}
