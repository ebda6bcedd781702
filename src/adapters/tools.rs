use crate::domain::ports::ToolLocator;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Looks executables up in the directories of a `PATH`-style variable.
#[derive(Debug, Clone)]
pub struct PathToolLocator {
    search_path: Option<OsString>,
}

impl PathToolLocator {
    pub fn from_env() -> Self {
        Self {
            search_path: std::env::var_os("PATH"),
        }
    }

    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(search_path.into()),
        }
    }
}

impl Default for PathToolLocator {
    fn default() -> Self {
        Self::from_env()
    }
}

impl ToolLocator for PathToolLocator {
    fn locate(&self, name: &str) -> Option<PathBuf> {
        // Explicit paths skip the search.
        if name.contains(std::path::MAIN_SEPARATOR) {
            let path = PathBuf::from(name);
            return is_executable(&path).then_some(path);
        }

        let search_path = self.search_path.as_ref()?;
        std::env::split_paths(search_path)
            .flat_map(|dir| candidates(&dir, name))
            .find(|candidate| is_executable(candidate))
    }
}

#[cfg(windows)]
fn candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    vec![dir.join(name), dir.join(format!("{}.exe", name))]
}

#[cfg(not(windows))]
fn candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    vec![dir.join(name)]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
