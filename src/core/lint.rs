//! Content-integrity checks over the MDX pages of the site.
//!
//! Every page must carry a title, its layout import must resolve, and every
//! internal link must land on an existing page or static asset.

use crate::core::links::{classify, links_in, LinkKind};
use crate::domain::model::MdxDocument;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

// closed ``` and ~~~ fences, then an unclosed one running to the end
static FENCED_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ms)^[ \t]*```[^`\n]*$.*?^[ \t]*```|^[ \t]*~~~[^\n]*$.*?^[ \t]*~~~|^[ \t]*(?:```[^`\n]*|~~~[^\n]*)$.*",
    )
    .expect("fenced code pattern")
});

static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`\n]*`").expect("inline code pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintIssue {
    pub path: PathBuf,
    pub rule: &'static str,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for LintIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}\n  \u{2192} {}",
            self.severity,
            self.rule,
            self.path.display(),
            self.message
        )
    }
}

#[derive(Debug, Clone)]
pub struct LintOptions {
    /// Content root; site-absolute links (`/react/hooks`) resolve against it.
    pub root: PathBuf,
    /// Directory of static assets served at the site root.
    pub public_dir: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct LintReport {
    pub documents: usize,
    pub issues: Vec<LintIssue>,
}

impl LintReport {
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

pub fn lint_documents(docs: &[MdxDocument], options: &LintOptions) -> LintReport {
    let mut issues = Vec::new();
    let mut titles: HashMap<&str, &Path> = HashMap::new();

    for doc in docs {
        let mut push = |rule, severity, message: String| {
            issues.push(LintIssue {
                path: doc.path.clone(),
                rule,
                severity,
                message,
            })
        };

        if let Some(error) = &doc.error {
            push("unreadable", Severity::Error, error.clone());
            continue;
        }

        let fm = &doc.front_matter;
        if fm.is_empty() {
            push(
                "missing-front-matter",
                Severity::Error,
                "page has no front-matter block".to_string(),
            );
        }

        match fm.title().map(str::trim).filter(|t| !t.is_empty()) {
            None => push(
                "empty-title",
                Severity::Error,
                "front-matter `title` is missing or empty".to_string(),
            ),
            Some(title) => {
                if let Some(first) = titles.get(title) {
                    push(
                        "duplicate-title",
                        Severity::Warning,
                        format!("title \"{}\" already used by {}", title, first.display()),
                    );
                } else {
                    titles.insert(title, &doc.path);
                }
            }
        }

        if fm.description().is_none_or(|d| d.trim().is_empty()) {
            push(
                "empty-description",
                Severity::Warning,
                "front-matter `description` is missing or empty".to_string(),
            );
        }

        let doc_dir = doc.path.parent().unwrap_or(Path::new(""));
        if let Some(layout) = fm.layout().filter(|l| !l.trim().is_empty()) {
            if !doc_dir.join(layout).is_file() {
                push(
                    "unresolved-layout",
                    Severity::Error,
                    format!("layout `{}` does not exist", layout),
                );
            }
        }

        let prose = doc.body.as_deref().map(without_code).unwrap_or_default();
        for link in links_in(&prose) {
            if let LinkKind::Internal(target) = classify(&link.url) {
                let target = link_path(&target);
                if !target.is_empty() && !resolves(&target, doc_dir, options) {
                    push(
                        "broken-link",
                        Severity::Error,
                        format!("link [{}]({}) does not resolve", link.text, link.url),
                    );
                }
            }
        }
    }

    LintReport {
        documents: docs.len(),
        issues,
    }
}

/// Body text with fenced and inline code removed.
fn without_code(body: &str) -> String {
    let body = FENCED_CODE.replace_all(body, "");
    INLINE_CODE.replace_all(&body, "").into_owned()
}

/// Path part of a link target: `<...>` unwrapped, a trailing `"title"`
/// dropped and `%XX` escapes decoded.
fn link_path(target: &str) -> String {
    let path = match target.strip_prefix('<') {
        Some(rest) => rest.split('>').next().unwrap_or(rest),
        None => target.split_whitespace().next().unwrap_or(""),
    };
    match urlencoding::decode(path) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => path.to_string(),
    }
}

fn resolves(target: &str, doc_dir: &Path, options: &LintOptions) -> bool {
    if let Some(site_path) = target.strip_prefix('/') {
        let site_path = site_path.trim_end_matches('/');
        if site_path.is_empty() {
            return page_exists(&options.root.join("index"));
        }
        page_exists(&options.root.join(site_path))
            || options
                .public_dir
                .as_ref()
                .is_some_and(|public| public.join(site_path).is_file())
    } else {
        page_exists(&doc_dir.join(target.trim_end_matches('/')))
    }
}

fn page_exists(base: &Path) -> bool {
    if base.is_file() {
        return true;
    }
    let with_ext = |ext: &str| PathBuf::from(format!("{}.{}", base.display(), ext));
    with_ext("mdx").is_file()
        || with_ext("md").is_file()
        || base.join("index.mdx").is_file()
        || base.join("index.md").is_file()
}
