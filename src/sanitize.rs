//! Generated code cleanup.
//!
//! Backends produce pytest/Playwright snippets with a handful of recurring
//! defects: markdown fences left in the code, helpers called on the wrong
//! object, a `with ... new_context(...) as api_context:` block the sync API
//! does not support, and modules used without being imported. [`sanitize`]
//! fixes all of them and is idempotent.

use crate::record::{TestCaseRecord, DEFAULT_RECORD_NAME};
use crate::repair::strip_fences;
use once_cell::sync::Lazy;
use regex::Regex;

const INDENT_UNIT: &str = "    ";

/// Helpers backends invent on fixture objects, with their real equivalents.
static HALLUCINATED_CALLS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"\b(?:playwright|page|api_context|request)\.uuid4\(\)").expect("valid regex"),
            "str(uuid.uuid4())",
        ),
        (
            Regex::new(r"\b(?:playwright|page|api_context|request)\.timestamp\(\)").expect("valid regex"),
            "int(time.time())",
        ),
    ]
});

static TYPED_CONTEXT_FIXTURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^([ \t]*def[ \t]+\w+[ \t]*\()api_context[ \t]*:[ \t]*APIRequestContext\)")
        .expect("valid regex")
});

static CONTEXT_FIXTURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^([ \t]*def[ \t]+\w+[ \t]*\()api_context\)").expect("valid regex")
});

static SCOPED_CONTEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<indent>[ \t]*)with\s+playwright\.request\.new_context\((?P<args>.*)\)\s+as\s+(?P<var>\w+)\s*:\s*$",
    )
    .expect("valid regex")
});

static TEST_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(?P<indent>[ \t]*)def[ \t]+test_\w*[ \t]*\(.*\)[ \t]*(?:->[^:\n]+)?:[ \t]*$")
        .expect("valid regex")
});

/// An import that must be present whenever its module is referenced.
struct RequiredImport {
    statement: &'static str,
    used: Regex,
    present: Regex,
}

static REQUIRED_IMPORTS: Lazy<Vec<RequiredImport>> = Lazy::new(|| {
    let entry = |statement, used: &str, present: &str| RequiredImport {
        statement,
        used: Regex::new(used).expect("valid regex"),
        present: Regex::new(present).expect("valid regex"),
    };
    vec![
        entry(
            "import pytest",
            r"\bpytest\.",
            r"(?m)^[ \t]*(?:import[ \t]+pytest\b|from[ \t]+pytest[ \t]+import\b)",
        ),
        entry(
            "import uuid",
            r"\buuid\.",
            r"(?m)^[ \t]*import[ \t]+(?:[\w.]+[ \t]*,[ \t]*)*uuid\b",
        ),
        entry(
            "import time",
            r"\btime\.",
            r"(?m)^[ \t]*import[ \t]+(?:[\w.]+[ \t]*,[ \t]*)*time\b",
        ),
        entry(
            "from unittest.mock import MagicMock",
            r"(?:^|[^.\w])MagicMock\b",
            r"(?m)^[ \t]*from[ \t]+unittest\.mock[ \t]+import\b[^\n]*\bMagicMock\b",
        ),
    ]
});

/// Clean one generated snippet. `sanitize(sanitize(x)) == sanitize(x)`.
pub fn sanitize(code: &str) -> String {
    let code = strip_fences(code);
    let code = fix_hallucinated_calls(&code);
    let code = fix_fixture_signatures(&code);
    let code = rewrite_scoped_context(&code);
    let code = ensure_context_opened(&code);
    let code = ensure_imports(&code);
    code.trim().to_string()
}

/// Normalise a record in place: fence-free name (never empty) and sanitized code.
pub fn sanitize_record(record: &mut TestCaseRecord) {
    let name = strip_fences(&record.name);
    record.name = if name.is_empty() {
        DEFAULT_RECORD_NAME.to_string()
    } else {
        name
    };
    record.code = record
        .code
        .as_deref()
        .map(sanitize)
        .filter(|code| !code.is_empty());
}

fn fix_hallucinated_calls(code: &str) -> String {
    HALLUCINATED_CALLS
        .iter()
        .fold(code.to_string(), |acc, (pattern, replacement)| {
            pattern.replace_all(&acc, *replacement).into_owned()
        })
}

fn fix_fixture_signatures(code: &str) -> String {
    let code = TYPED_CONTEXT_FIXTURE.replace_all(code, "${1}playwright: Playwright)");
    CONTEXT_FIXTURE
        .replace_all(&code, "${1}playwright)")
        .into_owned()
}

/// Turn `with playwright.request.new_context(..) as ctx:` blocks into an
/// explicit open, the block body one level shallower, and `ctx.dispose()`.
fn rewrite_scoped_context(code: &str) -> String {
    let mut lines: Vec<String> = code.lines().map(str::to_string).collect();
    let mut rewritten = false;

    while let Some(start) = lines.iter().position(|l| SCOPED_CONTEXT.is_match(l)) {
        let (indent, args, var) = match SCOPED_CONTEXT.captures(&lines[start]) {
            Some(caps) => (
                caps["indent"].to_string(),
                caps["args"].to_string(),
                caps["var"].to_string(),
            ),
            None => break,
        };

        // Body: everything indented deeper than the `with`, minus trailing blanks.
        let mut end = start + 1;
        let mut body_end = end;
        while end < lines.len() {
            let line = &lines[end];
            if line.trim().is_empty() {
                end += 1;
                continue;
            }
            if leading_width(line) <= indent.len() {
                break;
            }
            end += 1;
            body_end = end;
        }

        let body_indent = lines[start + 1..body_end]
            .iter()
            .find(|l| !l.trim().is_empty())
            .map(|l| l[..leading_width(l)].to_string())
            .unwrap_or_else(|| format!("{}{}", indent, INDENT_UNIT));
        let unit_len = body_indent.len().saturating_sub(indent.len());

        let mut replacement = vec![format!(
            "{}{} = playwright.request.new_context({})",
            indent, var, args
        )];
        for line in &lines[start + 1..body_end] {
            if line.trim().is_empty() {
                replacement.push(String::new());
            } else {
                let strip = unit_len.min(leading_width(line).saturating_sub(indent.len()));
                replacement.push(format!("{}{}", indent, &line[indent.len() + strip..]));
            }
        }
        replacement.push(format!("{}{}.dispose()", indent, var));

        lines.splice(start..body_end, replacement);
        rewritten = true;
    }

    if rewritten {
        lines.join("\n")
    } else {
        code.to_string()
    }
}

/// Width in bytes of the leading spaces/tabs.
fn leading_width(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}

/// `api_context` used but never opened: open it first thing in each test.
fn ensure_context_opened(code: &str) -> String {
    if !code.contains("api_context.") || code.contains("new_context") {
        return code.to_string();
    }
    TEST_DECLARATION
        .replace_all(code, |caps: &regex::Captures| {
            format!(
                "{}\n{}{}api_context = playwright.request.new_context()",
                &caps[0], &caps["indent"], INDENT_UNIT
            )
        })
        .into_owned()
}

fn ensure_imports(code: &str) -> String {
    let missing: Vec<&str> = REQUIRED_IMPORTS
        .iter()
        .filter(|req| req.used.is_match(code) && !req.present.is_match(code))
        .map(|req| req.statement)
        .collect();
    if missing.is_empty() {
        code.to_string()
    } else {
        format!("{}\n{}", missing.join("\n"), code)
    }
}
