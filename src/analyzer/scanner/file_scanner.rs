use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

use crate::constants::analysis;
use crate::types::{DraftsmithError, Result};

pub struct FileScanner {
    root: PathBuf,
    extension: String,
    exclude: Vec<glob::Pattern>,
    max_file_size: u64,
}

impl FileScanner {
    /// Scanner for `.java` sources with the default skip directories
    pub fn java_files<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            extension: "java".to_string(),
            exclude: Vec::new(),
            max_file_size: analysis::MAX_FILE_SIZE,
        }
    }

    /// Add glob excludes matched against paths relative to the root.
    /// Invalid patterns are rejected.
    pub fn with_exclude(mut self, patterns: &[String]) -> Result<Self> {
        for pattern in patterns {
            let compiled = glob::Pattern::new(pattern).map_err(|e| {
                DraftsmithError::Config(format!("invalid exclude pattern '{}': {}", pattern, e))
            })?;
            self.exclude.push(compiled);
        }
        Ok(self)
    }

    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scan(&self) -> Result<Vec<ScannedFile>> {
        if !self.root.is_dir() {
            return Err(DraftsmithError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("source root not found: {}", self.root.display()),
            )));
        }

        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(false) // Security: prevent symlink traversal attacks
            .filter_entry(|entry| {
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                !(is_dir
                    && entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| analysis::SKIP_DIRS.contains(&name)))
            })
            .build();

        let mut files = Vec::new();
        for entry in walker.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !entry.file_type().is_some_and(|t| t.is_file()) || !self.has_extension(path) {
                continue;
            }

            let relative = path
                .strip_prefix(&self.root)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");
            if self.exclude.iter().any(|p| p.matches(&relative)) {
                continue;
            }

            let Ok(metadata) = path.metadata() else {
                continue;
            };
            if metadata.len() > self.max_file_size {
                tracing::debug!("Skipping oversized file {}", relative);
                continue;
            }

            files.push(ScannedFile {
                path: path.to_path_buf(),
                relative,
                size: metadata.len(),
            });
        }

        files.sort_by(|a, b| a.relative.cmp(&b.relative));
        Ok(files)
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| ext == self.extension)
    }
}

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    /// Forward-slash path relative to the scan root
    pub relative: String,
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "class A {}").unwrap();
    }

    #[test]
    fn test_java_files_skip_build_dirs() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/main/java/a/User.java");
        touch(dir.path(), "src/main/java/a/notes.txt");
        touch(dir.path(), "target/classes/a/User.java");
        touch(dir.path(), "build/gen/Gen.java");
        touch(dir.path(), ".idea/Stuff.java");

        let files = FileScanner::java_files(dir.path()).scan().unwrap();
        let relative: Vec<_> = files.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(relative, vec!["src/main/java/a/User.java"]);
    }

    #[test]
    fn test_exclude_patterns() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/main/java/a/User.java");
        touch(dir.path(), "src/test/java/a/UserTest.java");

        let files = FileScanner::java_files(dir.path())
            .with_exclude(&["src/test/**".to_string()])
            .unwrap()
            .scan()
            .unwrap();
        assert_eq!(files.len(), 1);
        assert!(FileScanner::java_files(dir.path()).with_exclude(&["[".to_string()]).is_err());
    }

    #[test]
    fn test_missing_root() {
        let dir = TempDir::new().unwrap();
        assert!(FileScanner::java_files(dir.path().join("nope")).scan().is_err());
    }
}
