//! User configuration for note generation.
//!
//! Settings are plain data. They are loaded once by the caller and passed
//! into every render call; nothing in the engine reads global state.

use crate::error::Result;
use crate::record::KeyCase;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Folder (relative to the vault root) new notes are placed in.
    pub folder: String,

    /// File name format, e.g. `{{title}} - {{author}}`. Empty means the
    /// built-in `title - author` naming.
    pub file_name_format: String,

    /// Extra frontmatter text (`key: value` lines) added to every note.
    pub frontmatter: String,

    /// Body text written below the frontmatter.
    pub content: String,

    /// Emit the book record itself as frontmatter, merged with
    /// [`Settings::frontmatter`].
    pub use_default_frontmatter: bool,

    pub default_frontmatter_key_type: KeyCase,

    /// Template file (relative to the vault root). When set it replaces
    /// `frontmatter` and `content` entirely.
    pub template_file: String,

    pub locale_preference: String,

    /// API key for the National Library of Korea catalog.
    pub nl_api_key: String,

    /// Evaluate `<%= %>` expressions in templates.
    pub enable_inline_scripts: bool,

    pub open_page_on_completion: bool,

    /// Download the book cover into the vault when a note is created.
    pub enable_cover_image_save: bool,

    /// Vault folder saved covers go to.
    pub cover_image_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            folder: String::new(),
            file_name_format: String::new(),
            frontmatter: String::new(),
            content: String::new(),
            use_default_frontmatter: true,
            default_frontmatter_key_type: KeyCase::CamelCase,
            template_file: String::new(),
            locale_preference: "default".to_string(),
            nl_api_key: String::new(),
            enable_inline_scripts: true,
            open_page_on_completion: true,
            enable_cover_image_save: false,
            cover_image_path: String::new(),
        }
    }
}

impl Settings {
    /// Reads settings from a YAML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// The locale to query providers with, if the user picked one.
    pub fn locale(&self) -> Option<&str> {
        match self.locale_preference.trim() {
            "" | "default" => None,
            locale => Some(locale),
        }
    }
}
