//! Note composition: settings + record -> file name and Markdown text.

use crate::date::Clock;
use crate::diagnostic::Diagnostic;
use crate::error::{Error, Result};
use crate::filename::make_file_name;
use crate::frontmatter::{apply_default_front_matter, to_string_front_matter};
use crate::record::Record;
use crate::script::ScriptEvaluator;
use crate::settings::Settings;
use crate::template::resolve_template;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// A fully rendered note, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNote {
    pub file_name: String,
    pub contents: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Renders the note for `record`.
///
/// `template` is the text of the configured template file, if any. A
/// template replaces the frontmatter/content settings entirely; otherwise
/// the note is `---\n<frontmatter>\n---\n<content>`, with the fences
/// omitted when there is no frontmatter.
pub fn render_note(
    settings: &Settings,
    record: &Record,
    clock: &dyn Clock,
    template: Option<&str>,
) -> Result<RenderedNote> {
    let evaluator = settings.enable_inline_scripts.then(ScriptEvaluator::new);
    let scripts = evaluator.as_ref();

    let (file_name, mut diagnostics) =
        make_file_name(record, Some(&settings.file_name_format), clock, scripts)?;

    if let Some(template) = template {
        let (contents, diags) = resolve_template(template, record, clock, scripts)?;
        diagnostics.extend(diags);
        return Ok(RenderedNote {
            file_name,
            contents,
            diagnostics,
        });
    }

    let (mut frontmatter, diags) = resolve_template(&settings.frontmatter, record, clock, scripts)?;
    diagnostics.extend(diags);
    if settings.use_default_frontmatter {
        let merged = apply_default_front_matter(
            record,
            frontmatter.as_str(),
            settings.default_frontmatter_key_type,
        );
        frontmatter = to_string_front_matter(&merged);
    }

    let (content, diags) = resolve_template(&settings.content, record, clock, scripts)?;
    diagnostics.extend(diags);

    let contents = if frontmatter.is_empty() {
        content
    } else {
        format!("---\n{frontmatter}\n---\n{content}")
    };

    Ok(RenderedNote {
        file_name,
        contents,
        diagnostics,
    })
}

/// Where rendered notes are persisted.
pub trait NoteSink {
    /// Creates `folder/file_name` with `contents` and returns its path.
    /// Existing notes are never overwritten.
    fn create(&self, folder: &str, file_name: &str, contents: &str) -> Result<PathBuf>;
}

/// A vault rooted at a directory on the local file system.
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reads a template file relative to the vault root. A path without an
    /// extension is looked up as a `.md` note first.
    pub fn read_template(&self, template_file: &str) -> Result<String> {
        let path = self.root.join(template_file.trim());
        if path.extension().is_none() {
            let mut with_ext = path.clone().into_os_string();
            with_ext.push(".md");
            let with_ext = PathBuf::from(with_ext);
            if with_ext.is_file() {
                return Ok(fs::read_to_string(with_ext)?);
            }
        }
        Ok(fs::read_to_string(path)?)
    }
}

impl FsVault {
    /// Stores a binary attachment under `folder` and returns its
    /// vault-relative path (`/`-separated). An existing file is kept as is
    /// and `fetch` is not called.
    pub fn save_attachment(
        &self,
        folder: &str,
        file_name: &str,
        fetch: impl FnOnce() -> Result<Vec<u8>>,
    ) -> Result<String> {
        let folder = folder.trim().trim_matches('/');
        let relative = if folder.is_empty() {
            file_name.to_string()
        } else {
            format!("{folder}/{file_name}")
        };

        let dir = self.root.join(folder);
        let path = dir.join(file_name);
        if path.exists() {
            log::debug!("attachment {} already present", path.display());
            return Ok(relative);
        }

        let bytes = fetch()?;
        fs::create_dir_all(&dir)?;
        fs::write(&path, bytes)?;
        Ok(relative)
    }
}

impl NoteSink for FsVault {
    fn create(&self, folder: &str, file_name: &str, contents: &str) -> Result<PathBuf> {
        let dir = self.root.join(folder.trim().trim_matches('/'));
        fs::create_dir_all(&dir)?;

        let path = dir.join(file_name);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(Error::NoteExists(path));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(contents.as_bytes())?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::FixedClock;
    use crate::record::KeyCase;
    use tempfile::tempdir;
    use time::macros::datetime;

    fn clock() -> FixedClock {
        FixedClock(datetime!(2024-03-09 10:00 UTC))
    }

    fn dune() -> Record {
        let mut r = Record::new();
        r.insert("title", "Dune");
        r.insert("author", "Frank Herbert");
        r.insert("publishDate", "1965");
        r
    }

    #[test]
    fn default_note_merges_frontmatter_and_renders_body() {
        let settings = Settings {
            frontmatter: "tags: book\ncreated: {{DATE}}\nauthor: {{author}}".to_string(),
            content: "# {{title}}\n\n<%= book.title | upper %>".to_string(),
            default_frontmatter_key_type: KeyCase::SnakeCase,
            ..Default::default()
        };
        let note = render_note(&settings, &dune(), &clock(), None).unwrap();
        assert_eq!(note.file_name, "Dune - Frank Herbert.md");
        assert_eq!(
            note.contents,
            "---\ntitle: Dune\nauthor: Frank Herbert\npublish_date: 1965\ntags: book\ncreated: 2024-03-09\n---\n# Dune\n\nDUNE"
        );
        assert!(note.diagnostics.is_empty());
    }

    #[test]
    fn no_default_frontmatter_and_no_extra_means_body_only() {
        let settings = Settings {
            use_default_frontmatter: false,
            content: "{{title}}".to_string(),
            ..Default::default()
        };
        let note = render_note(&settings, &dune(), &clock(), None).unwrap();
        assert_eq!(note.contents, "Dune");
    }

    #[test]
    fn template_file_replaces_settings_text() {
        let settings = Settings {
            frontmatter: "ignored: yes".to_string(),
            file_name_format: "{{DATE:YYYY}} {{title}}".to_string(),
            ..Default::default()
        };
        let template = "---\ntitle: {{title}}\n---\nRead on {{DATE+1}}: <%= book.author %>";
        let note = render_note(&settings, &dune(), &clock(), Some(template)).unwrap();
        assert_eq!(note.file_name, "2024 Dune.md");
        assert_eq!(
            note.contents,
            "---\ntitle: Dune\n---\nRead on 2024-03-10: Frank Herbert"
        );
    }

    #[test]
    fn script_failures_surface_as_diagnostics() {
        let settings = Settings {
            use_default_frontmatter: false,
            content: "<%= book.title.nope() %> {{title}}".to_string(),
            ..Default::default()
        };
        let note = render_note(&settings, &dune(), &clock(), None).unwrap();
        assert_eq!(note.contents, "<%= book.title.nope() %> Dune");
        assert_eq!(note.diagnostics.len(), 1);
    }

    #[test]
    fn disabled_scripts_are_a_distinct_error() {
        let settings = Settings {
            enable_inline_scripts: false,
            content: "<%= book.title %>".to_string(),
            ..Default::default()
        };
        let err = render_note(&settings, &dune(), &clock(), None).unwrap_err();
        assert!(matches!(err, Error::ScriptEngineUnavailable), "{err}");

        // no script tokens: disabled engine is irrelevant.
        let settings = Settings {
            enable_inline_scripts: false,
            content: "{{title}}".to_string(),
            ..Default::default()
        };
        assert!(render_note(&settings, &dune(), &clock(), None).is_ok());
    }

    #[test]
    fn vault_creates_folders_and_refuses_overwrite() {
        let dir = tempdir().unwrap();
        let vault = FsVault::new(dir.path());

        let path = vault.create("Books/Read/", "Dune.md", "hello").unwrap();
        assert_eq!(path, dir.path().join("Books").join("Read").join("Dune.md"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");

        let err = vault.create("Books/Read", "Dune.md", "again").unwrap_err();
        assert!(matches!(err, Error::NoteExists(_)), "{err}");
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn file_name_diagnostics_are_collected() {
        let settings = Settings {
            use_default_frontmatter: false,
            file_name_format: "<%= book.nope() %>{{title}}".to_string(),
            content: "{{title}}".to_string(),
            ..Default::default()
        };
        let note = render_note(&settings, &dune(), &clock(), None).unwrap();
        assert_eq!(note.diagnostics.len(), 1);
        assert_eq!(note.diagnostics[0].code, "script.eval_failed");
    }

    #[test]
    fn disabled_scripts_leave_field_borne_tokens_alone() {
        let mut record = dune();
        record.insert("description", "see <%= book.title | upper %> here");
        let settings = Settings {
            enable_inline_scripts: false,
            use_default_frontmatter: false,
            content: "{{description}}".to_string(),
            ..Default::default()
        };
        let note = render_note(&settings, &record, &clock(), None).unwrap();
        assert_eq!(note.contents, "see <%= book.title | upper %> here");
        assert_eq!(note.diagnostics[0].code, "script.not_evaluated");
    }

    #[test]
    fn attachments_are_written_once() {
        let dir = tempdir().unwrap();
        let vault = FsVault::new(dir.path());

        let rel = vault
            .save_attachment("/covers/", "Dune.jpg", || Ok(b"img".to_vec()))
            .unwrap();
        assert_eq!(rel, "covers/Dune.jpg");
        assert_eq!(fs::read(dir.path().join("covers").join("Dune.jpg")).unwrap(), b"img");

        let rel = vault
            .save_attachment("covers", "Dune.jpg", || panic!("must not refetch"))
            .unwrap();
        assert_eq!(rel, "covers/Dune.jpg");

        assert_eq!(
            vault.save_attachment("", "x.png", || Ok(vec![1])).unwrap(),
            "x.png"
        );
    }

    #[test]
    fn read_template_adds_md_extension() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("templates")).unwrap();
        fs::write(dir.path().join("templates").join("book.md"), "T").unwrap();

        let vault = FsVault::new(dir.path());
        assert_eq!(vault.read_template("templates/book").unwrap(), "T");
        assert_eq!(vault.read_template("templates/book.md").unwrap(), "T");
        assert!(vault.read_template("templates/missing").is_err());
    }
}
