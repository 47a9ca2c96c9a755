use crate::domain::model::{FrontMatter, MdxDocument};
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

const DELIMITER: &str = "---";

/// All `.mdx` files below `root`, recursively, in path order.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>> {
    let root_str = glob::Pattern::escape(&root.to_string_lossy());
    let pattern = format!("{}/**/*.mdx", root_str.trim_end_matches('/'));

    let mut files = Vec::new();
    for entry in glob::glob(&pattern)? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => tracing::warn!("Skipping unreadable path {}: {}", e.path().display(), e),
        }
    }
    files.sort();
    Ok(files)
}

/// Splits `content` into its front-matter and the remaining body.
///
/// Content that does not open with `---`, or has no closing `---`, is
/// returned unchanged with an empty front-matter.
pub fn parse_front_matter(content: &str) -> (FrontMatter, String) {
    if !content.starts_with(DELIMITER) {
        return (FrontMatter::default(), content.to_string());
    }

    let parts: Vec<&str> = content.splitn(3, DELIMITER).collect();
    if parts.len() < 3 {
        return (FrontMatter::default(), content.to_string());
    }

    let mut front_matter = FrontMatter::default();
    for line in parts[1].trim().lines() {
        if let Some((key, value)) = line.split_once(':') {
            front_matter
                .fields
                .insert(key.trim().to_string(), unquote(value.trim()).to_string());
        }
    }

    (front_matter, parts[2].trim().to_string())
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Reads one document. Read failures are recorded on the document instead of
/// being returned, so one bad file never stops a batch.
pub fn read_document(path: &Path) -> MdxDocument {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match std::fs::read_to_string(path) {
        Ok(raw) => {
            let (front_matter, body) = parse_front_matter(&raw);
            MdxDocument {
                path: path.to_path_buf(),
                filename,
                front_matter,
                body: Some(body),
                raw: Some(raw),
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!("Error reading {}: {}", path.display(), e);
            MdxDocument {
                path: path.to_path_buf(),
                filename,
                front_matter: FrontMatter::default(),
                body: None,
                raw: None,
                error: Some(e.to_string()),
            }
        }
    }
}

pub fn read_all(root: &Path) -> Result<Vec<MdxDocument>> {
    let files = discover(root)?;
    tracing::info!("📚 Found {} MDX files in {}", files.len(), root.display());

    Ok(files
        .iter()
        .map(|path| {
            tracing::debug!("Processing {}", path.display());
            read_document(path)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_front_matter() {
        let content = "---\nlayout: ../../layouts/QuizLayout.astro\ntitle: \"Event Loop\"\ndescription: How JS schedules work: tasks and microtasks\n---\n\n# Event Loop\n\nBody text.\n";
        let (fm, body) = parse_front_matter(content);

        assert_eq!(fm.layout(), Some("../../layouts/QuizLayout.astro"));
        assert_eq!(fm.title(), Some("Event Loop"));
        assert_eq!(
            fm.description(),
            Some("How JS schedules work: tasks and microtasks")
        );
        assert_eq!(body, "# Event Loop\n\nBody text.");
    }

    #[test]
    fn test_no_front_matter_returns_content_unchanged() {
        let content = "# Title\n\ntext\n";
        let (fm, body) = parse_front_matter(content);
        assert!(fm.is_empty());
        assert_eq!(body, content);
    }

    #[test]
    fn test_unterminated_front_matter_returns_content_unchanged() {
        let content = "---\ntitle: Broken\n";
        let (fm, body) = parse_front_matter(content);
        assert!(fm.is_empty());
        assert_eq!(body, content);
    }

    #[test]
    fn test_lines_without_colon_are_ignored_and_body_keeps_rules() {
        let content = "---\ntitle: Generics\njust a line\n---\nA\n\n---\n\nB";
        let (fm, body) = parse_front_matter(content);
        assert_eq!(fm.fields.len(), 1);
        assert_eq!(body, "A\n\n---\n\nB");
    }

    #[test]
    fn test_unquote_mismatched_quotes_kept() {
        assert_eq!(unquote("'single'"), "single");
        assert_eq!(unquote("\"open"), "\"open");
        assert_eq!(unquote("\""), "\"");
    }

    #[test]
    fn test_discover_and_read_all() {
        let dir = TempDir::new().unwrap();
        let pages = dir.path().join("pages");
        std::fs::create_dir_all(pages.join("react")).unwrap();
        std::fs::write(pages.join("react/hooks.mdx"), "---\ntitle: Hooks\n---\nuseState").unwrap();
        std::fs::write(pages.join("intro.mdx"), "plain").unwrap();
        std::fs::write(pages.join("notes.md"), "not mdx").unwrap();

        let docs = read_all(&pages).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].filename, "intro.mdx");
        assert_eq!(docs[1].front_matter.title(), Some("Hooks"));
        assert_eq!(docs[1].body.as_deref(), Some("useState"));
    }

    #[test]
    fn test_unreadable_document_records_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.mdx");
        let doc = read_document(&path);
        assert!(doc.body.is_none());
        assert!(doc.raw.is_none());
        assert!(doc.error.is_some());
        assert_eq!(doc.filename, "missing.mdx");
    }
}
