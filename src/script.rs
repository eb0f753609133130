//! Inline `<%= expr %>` expressions.
//!
//! Expressions are MiniJinja expressions evaluated with a single variable,
//! `book`, bound to the record:
//!
//! ```text
//! <%= book.title | upper %>
//! <%= book.authors | join(" & ") %>
//! <%= (book) => book.publishDate[:4] %>
//! ```
//!
//! The environment starts empty: no globals, no functions, no loader, and
//! only an allow-list of pure builtin filters and tests. Execution is fuel
//! limited, so an expression can only compute over the record it was
//! handed.

use crate::diagnostic::{Diagnostic, Span};
use crate::record::Record;
use log::warn;
use minijinja::value::{Value, ValueKind};
use minijinja::{Environment, context, filters, tests as checks};
use regex::Regex;
use std::sync::LazyLock;

static SCRIPT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<%=(.+?)%>").expect("valid script regex"));

static ARROW_PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\(?\s*book\s*\)?\s*=>\s*(.+)$").expect("valid arrow regex")
});

/// Upper bound on instructions a single expression may execute.
const EXPRESSION_FUEL: u64 = 50_000;

/// Output of [`ScriptEvaluator::render`]: the rewritten text plus a
/// diagnostic for every token that could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutput {
    pub text: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Sandboxed evaluator for inline script tokens.
pub struct ScriptEvaluator {
    env: Environment<'static>,
}

impl Default for ScriptEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEvaluator {
    pub fn new() -> Self {
        let mut env = Environment::empty();
        env.set_fuel(Some(EXPRESSION_FUEL));

        env.add_filter("upper", filters::upper);
        env.add_filter("lower", filters::lower);
        env.add_filter("title", filters::title);
        env.add_filter("capitalize", filters::capitalize);
        env.add_filter("trim", filters::trim);
        env.add_filter("replace", filters::replace);
        env.add_filter("length", filters::length);
        env.add_filter("join", filters::join);
        env.add_filter("default", filters::default);
        env.add_filter("first", filters::first);
        env.add_filter("last", filters::last);
        env.add_filter("reverse", filters::reverse);
        env.add_filter("sort", filters::sort);
        env.add_filter("list", filters::list);
        env.add_filter("string", filters::string);
        env.add_filter("int", filters::int);
        env.add_filter("float", filters::float);
        env.add_filter("round", filters::round);
        env.add_filter("map", filters::map);
        env.add_filter("select", filters::select);
        env.add_filter("reject", filters::reject);
        env.add_filter("tojson", filters::tojson);

        env.add_test("defined", checks::is_defined);
        env.add_test("undefined", checks::is_undefined);
        env.add_test("none", checks::is_none);
        env.add_test("string", checks::is_string);
        env.add_test("number", checks::is_number);
        env.add_test("sequence", checks::is_sequence);
        env.add_test("startingwith", checks::is_startingwith);
        env.add_test("endingwith", checks::is_endingwith);

        Self { env }
    }

    /// Evaluates one expression against `book` and stringifies the result.
    pub fn eval(&self, expr: &str, book: &Record) -> Result<String, minijinja::Error> {
        let expr = strip_arrow_prefix(expr.trim());
        let compiled = self.env.compile_expression(expr)?;
        let value = compiled.eval(context! { book => book })?;
        Ok(stringify(&value))
    }

    /// Replaces every `<%= ... %>` token in `text`.
    ///
    /// Each token is evaluated on its own. A token that fails to compile or
    /// run is logged, reported as a diagnostic and left in place. Diagnostic
    /// spans are byte offsets into `text` as passed here, i.e. after date and
    /// field substitution.
    pub fn render(&self, book: &Record, text: &str) -> ScriptOutput {
        let mut out = String::with_capacity(text.len());
        let mut diagnostics = Vec::new();
        let mut last = 0;

        for caps in SCRIPT_REGEX.captures_iter(text) {
            let (Some(whole), Some(expr)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&text[last..whole.start()]);
            match self.eval(expr.as_str(), book) {
                Ok(value) => out.push_str(&value),
                Err(err) => {
                    warn!("failed to evaluate script {:?}: {err}", whole.as_str());
                    diagnostics.push(Diagnostic::warning(
                        "script.eval_failed",
                        err.to_string(),
                        Some(Span::new(whole.start(), whole.end())),
                    ));
                    out.push_str(whole.as_str());
                }
            }
            last = whole.end();
        }
        out.push_str(&text[last..]);

        ScriptOutput {
            text: out,
            diagnostics,
        }
    }
}

/// True if `text` contains at least one script token.
pub fn has_script_tokens(text: &str) -> bool {
    SCRIPT_REGEX.is_match(text)
}

fn strip_arrow_prefix(expr: &str) -> &str {
    ARROW_PREFIX_REGEX
        .captures(expr)
        .and_then(|caps| caps.get(1))
        .map_or(expr, |m| m.as_str().trim())
}

/// Strings as-is, sequences as `["a", "b"]`, undefined as nothing and
/// everything else as JSON.
///
/// An undefined result (e.g. a missing field) renders as the empty string,
/// not the literal text `undefined`.
fn stringify(value: &Value) -> String {
    match value.kind() {
        ValueKind::Undefined => String::new(),
        ValueKind::String => value.as_str().unwrap_or_default().to_string(),
        ValueKind::Seq => match value.try_iter() {
            Ok(items) => {
                let quoted: Vec<String> = items.map(|v| format!("\"{v}\"")).collect();
                format!("[{}]", quoted.join(", "))
            }
            Err(_) => value.to_string(),
        },
        _ => serde_json::to_string(value).unwrap_or_else(|_| value.to_string()),
    }
}
