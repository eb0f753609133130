//! Saving book cover images into the vault.

use crate::error::{Error, Result};
use crate::filename::replace_illegal_file_name_characters;
use crate::note::FsVault;
use crate::record::Record;
use reqwest::Url;
use std::time::Duration;

/// Record field the saved cover's vault-relative path is stored under.
pub const LOCAL_COVER_FIELD: &str = "localCoverImage";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_EXTENSION: &str = "jpg";

/// Downloads cover images.
pub trait CoverFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetches covers over HTTP(S).
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpCoverFetcher;

impl CoverFetcher for HttpCoverFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
        log::debug!("downloading cover {parsed}");

        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let resp = client.get(parsed).send()?.error_for_status()?;
        Ok(resp.bytes()?.to_vec())
    }
}

/// Saves the cover referenced by the record's `coverUrl` into `folder`.
///
/// Returns the vault-relative path, or `None` when the record has no cover.
pub fn save_cover(
    record: &Record,
    folder: &str,
    fetcher: &dyn CoverFetcher,
    vault: &FsVault,
) -> Result<Option<String>> {
    let url = record.text("coverUrl");
    let url = url.trim();
    if url.is_empty() {
        return Ok(None);
    }

    let file_name = cover_file_name(record, url);
    let relative = vault.save_attachment(folder, &file_name, || fetcher.fetch(url))?;
    Ok(Some(relative))
}

/// `<sanitized title>.<ext>`, falling back to `cover` for untitled records.
pub fn cover_file_name(record: &Record, url: &str) -> String {
    let stem = replace_illegal_file_name_characters(record.text("title").trim());
    let stem = stem.trim();
    let stem = if stem.is_empty() { "cover" } else { stem };
    format!("{stem}.{}", image_extension(url))
}

fn image_extension(url: &str) -> &'static str {
    let Ok(url) = Url::parse(url) else {
        return DEFAULT_EXTENSION;
    };
    let last = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    let ext = last
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpeg" => "jpeg",
        "png" => "png",
        "gif" => "gif",
        "webp" => "webp",
        _ => DEFAULT_EXTENSION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fs;
    use tempfile::tempdir;

    struct Stub {
        calls: Cell<usize>,
    }

    impl CoverFetcher for Stub {
        fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            self.calls.set(self.calls.get() + 1);
            Ok(b"\x89PNG".to_vec())
        }
    }

    fn dune(cover: &str) -> Record {
        let mut r = Record::new();
        r.insert("title", "Dune: Messiah");
        r.insert("coverUrl", cover);
        r
    }

    #[test]
    fn extension_comes_from_url_path() {
        assert_eq!(image_extension("https://x.y/a/b.PNG?size=2"), "png");
        assert_eq!(image_extension("https://x.y/a/b.webp"), "webp");
        assert_eq!(image_extension("https://x.y/cover?isbn=1"), "jpg");
        assert_eq!(image_extension("not a url"), "jpg");
    }

    #[test]
    fn file_name_is_sanitized_title() {
        assert_eq!(
            cover_file_name(&dune(""), "http://c.nl.go.kr/x.gif"),
            "Dune Messiah.gif"
        );
        assert_eq!(cover_file_name(&Record::new(), "http://x.y/a"), "cover.jpg");
    }

    #[test]
    fn saves_once_and_reuses_existing_file() {
        let dir = tempdir().unwrap();
        let vault = FsVault::new(dir.path());
        let stub = Stub {
            calls: Cell::new(0),
        };
        let record = dune("https://x.y/covers/1.png");

        let rel = save_cover(&record, "attachments", &stub, &vault).unwrap();
        assert_eq!(rel.as_deref(), Some("attachments/Dune Messiah.png"));
        assert_eq!(
            fs::read(dir.path().join("attachments").join("Dune Messiah.png")).unwrap(),
            b"\x89PNG"
        );

        save_cover(&record, "attachments", &stub, &vault).unwrap();
        assert_eq!(stub.calls.get(), 1);
    }

    #[test]
    fn no_cover_url_is_a_no_op() {
        let dir = tempdir().unwrap();
        let vault = FsVault::new(dir.path());
        let stub = Stub {
            calls: Cell::new(0),
        };
        assert_eq!(save_cover(&dune("  "), "", &stub, &vault).unwrap(), None);
        assert_eq!(stub.calls.get(), 0);
    }
}
