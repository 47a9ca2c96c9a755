use crate::domain::model::{Link, MdxDocument};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

static MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("markdown link pattern"));

static HTML_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<a\s+[^>]*href=["'](.*?)["'][^>]*>(.*?)</a>"#).expect("anchor pattern")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkKind {
    External,
    Anchor,
    /// Site-relative or document-relative target, without fragment or query.
    Internal(String),
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkKind::External => write!(f, "external"),
            LinkKind::Anchor => write!(f, "anchor"),
            LinkKind::Internal(target) => write!(f, "internal -> {}", target),
        }
    }
}

/// Markdown links first, then HTML anchors, each in document order.
pub fn links_in(body: &str) -> Vec<Link> {
    let markdown = MARKDOWN_LINK.captures_iter(body).map(|c| Link {
        text: c[1].to_string(),
        url: c[2].to_string(),
    });
    let html = HTML_LINK.captures_iter(body).map(|c| Link {
        text: c[2].to_string(),
        url: c[1].to_string(),
    });
    markdown.chain(html).collect()
}

pub fn extract_links(docs: &[MdxDocument]) -> BTreeMap<PathBuf, Vec<Link>> {
    docs.iter()
        .map(|doc| {
            let links = doc.body.as_deref().map(links_in).unwrap_or_default();
            (doc.path.clone(), links)
        })
        .collect()
}

pub fn classify(url: &str) -> LinkKind {
    let url = url.trim();
    if url.starts_with('#') {
        return LinkKind::Anchor;
    }
    // protocol-relative
    if url.starts_with("//") {
        return LinkKind::External;
    }
    match url::Url::parse(url) {
        Ok(_) => LinkKind::External,
        Err(_) => {
            let end = url.find(['#', '?']).unwrap_or(url.len());
            LinkKind::Internal(url[..end].to_string())
        }
    }
}
