use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Workspace a permission request originated from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectContext {
    pub name: String,
    pub base_path: PathBuf,
}

impl ProjectContext {
    pub fn new(name: impl Into<String>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            base_path: base_path.into(),
        }
    }

    /// Build a context named after the last component of `path`
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Self::new(name, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_path_uses_last_component() {
        let ctx = ProjectContext::from_path("/home/user/work/toolgate");
        assert_eq!(ctx.name, "toolgate");
        assert_eq!(ctx.base_path, PathBuf::from("/home/user/work/toolgate"));
    }

    #[test]
    fn from_root_path_falls_back_to_full_path() {
        let ctx = ProjectContext::from_path("/");
        assert_eq!(ctx.name, "/");
    }
}
