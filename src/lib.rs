pub mod book;
pub mod cover;
pub mod date;
pub mod diagnostic;
pub mod error;
pub mod filename;
pub mod frontmatter;
pub mod logging;
pub mod note;
pub mod provider;
pub mod record;
pub mod script;
pub mod settings;
pub mod template;

pub use book::{Book, is_isbn};
pub use cover::{CoverFetcher, HttpCoverFetcher};
pub use date::{Clock, FixedClock, SystemClock};
pub use error::{Error, Result};
pub use note::{FsVault, NoteSink, RenderedNote};
pub use record::{FieldValue, KeyCase, Record};
pub use settings::Settings;

use crate::diagnostic::Diagnostic;
use std::path::PathBuf;

/// Renders the note for `record` and creates it in `vault`.
///
/// The configured template file, if any, is read from the vault first.
/// With cover saving enabled the cover is downloaded before rendering and
/// its vault path is available as `localCoverImage`; a failed download is
/// reported as a diagnostic and does not stop the note.
pub fn create_book_note(
    settings: &Settings,
    record: &Record,
    clock: &dyn Clock,
    vault: &FsVault,
    covers: &dyn CoverFetcher,
) -> Result<(PathBuf, RenderedNote)> {
    let mut record = record.clone();
    let mut cover_failure = None;
    if settings.enable_cover_image_save {
        match cover::save_cover(&record, &settings.cover_image_path, covers, vault) {
            Ok(Some(path)) => record.insert(cover::LOCAL_COVER_FIELD, path),
            Ok(None) => {}
            Err(err) => {
                log::warn!("cover image not saved: {err}");
                cover_failure = Some(Diagnostic::warning(
                    "cover.save_failed",
                    err.to_string(),
                    None,
                ));
            }
        }
    }

    let mut note = render_book_note(settings, &record, clock, vault)?;
    note.diagnostics.extend(cover_failure);
    let path = vault.create(&settings.folder, &note.file_name, &note.contents)?;
    Ok((path, note))
}

/// Like [`create_book_note`], but only renders.
pub fn render_book_note(
    settings: &Settings,
    record: &Record,
    clock: &dyn Clock,
    vault: &FsVault,
) -> Result<RenderedNote> {
    let template = if settings.template_file.trim().is_empty() {
        None
    } else {
        Some(vault.read_template(&settings.template_file)?)
    };

    note::render_note(settings, record, clock, template.as_deref())
}
