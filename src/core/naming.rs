use std::path::{Component, Path};

const CONTENT_DIR: &str = "pages";

/// Bank key for a page: its directories below the content root (minus any
/// `pages` directory) and its file stem, joined with `_`.
///
/// `pages/react/hooks.mdx` becomes `react_hooks`.
///
/// A page directly under the root gets no leading separator: `index.mdx` is
/// `index`, never `_index`. A bank saved as `_index.json` is therefore not
/// recognised as existing and is not merged into; rename it to `index.json`.
pub fn bank_key(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);

    let mut parts: Vec<String> = relative
        .parent()
        .map(|parent| {
            parent
                .components()
                .filter_map(|c| match c {
                    Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                    _ => None,
                })
                .filter(|name| name != CONTENT_DIR)
                .collect()
        })
        .unwrap_or_default();

    let stem = relative
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    parts.push(stem);
    parts.join("_")
}

pub fn bank_file_name(path: &Path, root: &Path) -> String {
    format!("{}.json", bank_key(path, root))
}
