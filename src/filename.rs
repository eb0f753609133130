use crate::date::Clock;
use crate::diagnostic::Diagnostic;
use crate::error::Result;
use crate::record::Record;
use crate::script::ScriptEvaluator;
use crate::template::resolve_template;
use regex::Regex;
use std::sync::LazyLock;

static ILLEGAL_CHARS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\,#%&{}/*<>$":@.]"#).expect("valid filename regex"));

static WHITESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

pub const NOTE_EXTENSION: &str = ".md";

/// Removes characters that are not allowed in note file names and
/// collapses whitespace runs to a single space.
pub fn replace_illegal_file_name_characters(text: &str) -> String {
    let stripped = ILLEGAL_CHARS_REGEX.replace_all(text, "");
    WHITESPACE_REGEX.replace_all(&stripped, " ").into_owned()
}

/// Builds the note file name for `record`.
///
/// A non-empty `format` goes through the same date/field/script pipeline as
/// note text, so its diagnostics (and the disabled-scripts error) are the
/// same too. Without a format the name is `title` or `title - author`.
pub fn make_file_name(
    record: &Record,
    format: Option<&str>,
    clock: &dyn Clock,
    scripts: Option<&ScriptEvaluator>,
) -> Result<(String, Vec<Diagnostic>)> {
    let (name, diagnostics) = match format.filter(|f| !f.trim().is_empty()) {
        Some(format) => resolve_template(format, record, clock, scripts)?,
        None => {
            let title = record.text("title");
            let author = record.text("author");
            let name = if author.is_empty() {
                title
            } else {
                format!("{title} - {author}")
            };
            (name, Vec::new())
        }
    };

    let file_name = format!("{}{}", replace_illegal_file_name_characters(&name), NOTE_EXTENSION);
    Ok((file_name, diagnostics))
}
