use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::render::MelodyRequest;
use crate::Result;

/// One news item as served by the feed endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    #[serde(default)]
    pub subgenre: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub img_subgenre: Option<String>,
}

impl Article {
    /// Music for this slide: its own subgenre first, then the page category.
    /// The personalised page has no category.
    pub fn melody_request(&self, page_category: Option<&str>) -> MelodyRequest {
        MelodyRequest {
            title: self.title.clone(),
            subgenre: self.subgenre.clone(),
            category: page_category.map(str::to_string),
        }
    }
}

/// Parses one page of articles.
pub fn parse_feed(json: &str) -> Result<Vec<Article>> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_feed(path: &Path) -> Result<Vec<Article>> {
    let data = std::fs::read_to_string(path)?;
    parse_feed(&data)
}
