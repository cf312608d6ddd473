//! Rule files read straight from a local directory.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use zbot_core::loader::{LoadOutcome, DEFAULT_RULES_DIR};
use zbot_core::platform::{ContentReader, DirEntry, EntryKind, PlatformError, RepoRef};
use zbot_core::{RuleLoader, RulesLocation};

const LOCAL_REF: &str = "local";

/// A directory on disk posing as a repository. Listings are sorted by name.
pub struct LocalRules {
    root: PathBuf,
}

impl LocalRules {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

fn io_error(path: &Path, err: io::Error) -> PlatformError {
    if err.kind() == io::ErrorKind::NotFound {
        PlatformError::NotFound(path.display().to_string())
    } else {
        PlatformError::Transport(format!("{}: {err}", path.display()))
    }
}

#[async_trait]
impl ContentReader for LocalRules {
    async fn list_dir(
        &self,
        _repo: &RepoRef,
        path: &str,
        _reference: &str,
    ) -> Result<Vec<DirEntry>, PlatformError> {
        let dir = self.root.join(path);
        let mut read = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| io_error(&dir, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = read.next_entry().await.map_err(|e| io_error(&dir, e))? {
            let file_type = entry.file_type().await.map_err(|e| io_error(&dir, e))?;
            let kind = if file_type.is_file() {
                EntryKind::File
            } else if file_type.is_dir() {
                EntryKind::Dir
            } else {
                EntryKind::Other
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = if path == "." {
                name.clone()
            } else {
                format!("{path}/{name}")
            };
            entries.push(DirEntry { name, path, kind });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn read_file(
        &self,
        _repo: &RepoRef,
        path: &str,
        _reference: &str,
    ) -> Result<String, PlatformError> {
        let file = self.root.join(path);
        tokio::fs::read_to_string(&file)
            .await
            .map_err(|e| io_error(&file, e))
    }
}

/// The rules directory for `dir`: its `.github/zbot` when present, else `dir`.
pub fn rules_dir(dir: &Path) -> PathBuf {
    let nested = dir.join(DEFAULT_RULES_DIR);
    if nested.is_dir() {
        nested
    } else {
        dir.to_path_buf()
    }
}

/// Load every rule file in `dir` the same way the server loads a repository.
pub async fn load(dir: &Path) -> LoadOutcome {
    let loader = RuleLoader::new(RulesLocation {
        dir: ".".into(),
        reference: LOCAL_REF.into(),
    });
    let repo = RepoRef::new("local", dir.display().to_string());
    loader.load_from(&LocalRules::new(dir), &repo).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_rule_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b.yml"),
            "rules:\n  - name: second\n    event: issues\n    run: label(\"b\")\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.yaml"),
            "rules:\n  - name: first\n    event: issues\n    run: label(\"a\")\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.md"), "not rules").unwrap();
        std::fs::create_dir(dir.path().join("nested.yaml")).unwrap();

        let outcome = load(dir.path()).await;

        let names: Vec<&str> = outcome.rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert!(outcome.problems.is_empty());
    }

    #[tokio::test]
    async fn reports_unparseable_files_by_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.yaml"), "rules: [ {").unwrap();

        let outcome = load(dir.path()).await;

        assert!(outcome.rules.is_empty());
        assert_eq!(outcome.problems.len(), 1);
        assert_eq!(outcome.problems[0].path(), Some("bad.yaml"));
    }

    #[test]
    fn prefers_nested_rules_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(rules_dir(dir.path()), dir.path());

        std::fs::create_dir_all(dir.path().join(".github/zbot")).unwrap();
        assert_eq!(rules_dir(dir.path()), dir.path().join(".github/zbot"));
    }
}
