use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::path::PathBuf;

/// Report directory on the local disk.
///
/// Each write goes to a `.partial` sibling first and is then renamed over the
/// target, so a rerun replaces the previous report in one step and a crash
/// mid-write never leaves truncated JSON behind.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn full_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn staging_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.partial", name))
    }
}

impl Storage for LocalStorage {
    async fn write_file(&self, name: &str, data: &[u8]) -> Result<()> {
        let target = self.full_path(name);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let staging = self.staging_path(name);
        tokio::fs::write(&staging, data).await?;
        tokio::fs::rename(&staging, &target).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rerun_replaces_report() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().join("reports"));

        tokio_test::block_on(async {
            storage.write_file("report.json", b"first run, longer").await.unwrap();
            storage.write_file("report.json", b"second").await.unwrap();
        });

        let target = storage.full_path("report.json");
        assert_eq!(std::fs::read(&target).unwrap(), b"second");
        assert!(!storage.staging_path("report.json").exists());

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("reports"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("report.json")]);
    }
}
