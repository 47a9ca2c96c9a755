use crate::core::Storage;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(self.full_path(path)).await?)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(full_path, data).await?;
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.full_path(path)).await?)
    }

    async fn list(&self, pattern: &str) -> Result<Vec<String>> {
        let base = glob::Pattern::escape(&self.base_path.to_string_lossy());
        let full_pattern = match base.trim_end_matches('/') {
            "" => pattern.to_string(),
            base => format!("{}/{}", base, pattern),
        };

        let mut found: Vec<String> = glob::glob(&full_pattern)?
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file())
            .map(|path| {
                path.strip_prefix(&self.base_path)
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        found.sort();
        Ok(found)
    }

    fn locate(&self, path: &str) -> String {
        self.full_path(path).display().to_string()
    }
}
