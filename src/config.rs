//! Site configuration
//!
//! Search tuning and the static-page corpus live in a YAML file next to
//! the database. A missing file means built-in defaults; a malformed
//! file is an error rather than silently ignored.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::search::static_pages::StaticPage;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Snippet extraction tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchOptions {
    /// Characters of context kept on each side of a match
    pub snippet_radius: usize,
    /// Snippet cap per post, pseudo-snippets included
    pub max_post_snippets: usize,
    /// Snippet cap per static page
    pub max_page_snippets: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            snippet_radius: 80,
            max_post_snippets: 10,
            max_page_snippets: 5,
        }
    }
}

impl SearchOptions {
    /// Hard cap on a single snippet's length, in characters.
    pub fn max_snippet_len(&self) -> usize {
        self.snippet_radius * 2
    }
}

/// Site-level configuration: search tuning plus the static-page corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteConfig {
    pub search: SearchOptions,
    pub static_pages: Vec<StaticPage>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            search: SearchOptions::default(),
            static_pages: default_static_pages(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a YAML file. A missing file yields the
    /// built-in defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Write the configuration out as YAML.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// The pages every install can search before any customization.
fn default_static_pages() -> Vec<StaticPage> {
    vec![
        StaticPage {
            path: "/".to_string(),
            title: "Home".to_string(),
            searchable_text:
                "Home Hi Latest Posts Read My Blog Linux Networking Docker Self-Hosting"
                    .to_string(),
        },
        StaticPage {
            path: "/about".to_string(),
            title: "About".to_string(),
            searchable_text:
                "About Education Projects Work Experience Contact email LinkedIn GitHub CV Download"
                    .to_string(),
        },
        StaticPage {
            path: "/archives".to_string(),
            title: "Archives".to_string(),
            searchable_text: "Archives all posts by year by tag timeline".to_string(),
        },
        StaticPage {
            path: "/contact".to_string(),
            title: "Contact".to_string(),
            searchable_text: "Contact get in touch email LinkedIn GitHub message".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SiteConfig::default();
        assert_eq!(config.search.snippet_radius, 80);
        assert_eq!(config.search.max_post_snippets, 10);
        assert_eq!(config.search.max_page_snippets, 5);
        assert_eq!(config.search.max_snippet_len(), 160);
        assert!(!config.static_pages.is_empty());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SiteConfig::load(&dir.path().join("nope.yml")).unwrap();
        assert_eq!(config.search.snippet_radius, 80);
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.yml");
        fs::write(&path, "search:\n  snippetRadius: 40\n").unwrap();
        let config = SiteConfig::load(&path).unwrap();
        assert_eq!(config.search.snippet_radius, 40);
        assert_eq!(config.search.max_post_snippets, 10);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.yml");
        fs::write(&path, "search: [not a map").unwrap();
        assert!(SiteConfig::load(&path).is_err());
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.yml");
        let mut config = SiteConfig::default();
        config.search.snippet_radius = 60;
        config.save(&path).unwrap();
        let loaded = SiteConfig::load(&path).unwrap();
        assert_eq!(loaded.search.snippet_radius, 60);
    }
}
