//! `{{field}}` substitution against a [`Record`], and the full template
//! pipeline (dates, fields, scripts) built on top of it.

use crate::date::{Clock, replace_date_in_string};
use crate::diagnostic::Diagnostic;
use crate::error::{Error, Result};
use crate::record::Record;
use crate::script::{ScriptEvaluator, has_script_tokens};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^{}\r\n]+?)\}\}").expect("valid placeholder regex"));

static WORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+$").expect("valid word regex"));

/// Replaces `{{key}}` placeholders with record values.
///
/// - keys match record fields case-insensitively, first field in record
///   order wins
/// - absent values render as the empty string
/// - unknown `{{word}}` placeholders are removed; other unknown braces
///   (e.g. an unresolved `{{DATE:...}}`) are kept verbatim
/// - inserted values are never re-scanned
///
/// The result is trimmed. Blank templates short-circuit to `""`.
pub fn replace_variable_syntax(record: &Record, text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    PLACEHOLDER_REGEX
        .replace_all(text, |caps: &Captures| {
            let key = &caps[1];
            match record.lookup_ignore_case(key) {
                Some(value) => value.map(ToString::to_string).unwrap_or_default(),
                None if WORD_REGEX.is_match(key) => String::new(),
                None => caps[0].to_string(),
            }
        })
        .trim()
        .to_string()
}

/// Resolves one template: dates, then fields, then script expressions.
///
/// Fails only when the template itself uses script expressions and
/// `scripts` is `None`. Script tokens that arrive through field values are
/// evaluated when scripts are enabled and left as text otherwise.
/// Evaluation problems inside expressions become diagnostics.
pub fn resolve_template(
    text: &str,
    record: &Record,
    clock: &dyn Clock,
    scripts: Option<&ScriptEvaluator>,
) -> Result<(String, Vec<Diagnostic>)> {
    if scripts.is_none() && has_script_tokens(text) {
        return Err(Error::ScriptEngineUnavailable);
    }

    let substituted = replace_variable_syntax(record, &replace_date_in_string(text, clock));
    if !has_script_tokens(&substituted) {
        return Ok((substituted, Vec::new()));
    }

    match scripts {
        Some(scripts) => {
            let out = scripts.render(record, &substituted);
            Ok((out.text, out.diagnostics))
        }
        None => {
            let note = Diagnostic::info(
                "script.not_evaluated",
                "field values contain script expressions; inline scripts are disabled",
                None,
            );
            Ok((substituted, vec![note]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::FixedClock;
    use crate::diagnostic::Severity;
    use time::macros::datetime;

    fn clock() -> FixedClock {
        FixedClock(datetime!(2024-03-09 10:00 UTC))
    }

    fn book() -> Record {
        let mut r = Record::new();
        r.insert("title", "Dune");
        r.insert("author", "Frank Herbert");
        r.insert("authors", vec!["Frank Herbert".to_string(), "Brian".to_string()]);
        r.insert_absent("subtitle");
        r
    }

    #[test]
    fn substitutes_known_keys_case_insensitively() {
        assert_eq!(
            replace_variable_syntax(&book(), "{{title}} by {{AUTHOR}} / {{Title}}"),
            "Dune by Frank Herbert / Dune"
        );
    }

    #[test]
    fn lists_join_with_comma() {
        assert_eq!(
            replace_variable_syntax(&book(), "[{{authors}}]"),
            "[Frank Herbert,Brian]"
        );
    }

    #[test]
    fn unknown_and_absent_fields_are_removed_and_trimmed() {
        assert_eq!(replace_variable_syntax(&book(), "{{unknown}} hi"), "hi");
        assert_eq!(replace_variable_syntax(&book(), "a{{subtitle}}b"), "ab");
    }

    #[test]
    fn non_word_placeholders_survive() {
        assert_eq!(
            replace_variable_syntax(&book(), "{{DATE:YYYY}} {{title}}"),
            "{{DATE:YYYY}} Dune"
        );
    }

    #[test]
    fn blank_template_is_empty() {
        assert_eq!(replace_variable_syntax(&book(), ""), "");
        assert_eq!(replace_variable_syntax(&book(), "  \n\t"), "");
    }

    #[test]
    fn values_with_braces_are_not_re_expanded() {
        let mut r = Record::new();
        r.insert("title", "{{author}}");
        r.insert("author", "X");
        let once = replace_variable_syntax(&r, "{{title}} - {{author}}");
        assert_eq!(once, "{{author}} - X");
    }

    #[test]
    fn resolve_runs_dates_then_fields_then_scripts() {
        let scripts = ScriptEvaluator::new();
        let (out, diags) = resolve_template(
            "{{DATE}} {{title}} <%= book.author | upper %>",
            &book(),
            &clock(),
            Some(&scripts),
        )
        .unwrap();
        assert_eq!(out, "2024-03-09 Dune FRANK HERBERT");
        assert!(diags.is_empty());
    }

    #[test]
    fn template_scripts_without_engine_fail() {
        let err = resolve_template("<%= book.title %>", &book(), &clock(), None).unwrap_err();
        assert!(matches!(err, Error::ScriptEngineUnavailable), "{err}");
    }

    #[test]
    fn scripts_in_field_values_do_not_fail_without_engine() {
        let mut r = Record::new();
        r.insert("title", "Dune");
        r.insert("description", "see <%= book.title | upper %> here");

        let (out, diags) = resolve_template("{{description}}", &r, &clock(), None).unwrap();
        assert_eq!(out, "see <%= book.title | upper %> here");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Info);
        assert_eq!(diags[0].code, "script.not_evaluated");

        let scripts = ScriptEvaluator::new();
        let (out, diags) =
            resolve_template("{{description}}", &r, &clock(), Some(&scripts)).unwrap();
        assert_eq!(out, "see DUNE here");
        assert!(diags.is_empty());
    }
}
