use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Read access to project source text, keyed by the same relative paths the
/// graph and vector index use.
#[async_trait]
pub trait SourceReader: Send + Sync {
    async fn read(&self, path: &str) -> io::Result<String>;
}

/// Reads files from a project root on the local filesystem.
pub struct FsSourceReader {
    root: PathBuf,
}

impl FsSourceReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl SourceReader for FsSourceReader {
    async fn read(&self, path: &str) -> io::Result<String> {
        tokio::fs::read_to_string(self.root.join(path)).await
    }
}

/// In-memory source tree for tests and embedded use.
#[derive(Default)]
pub struct MemorySourceReader {
    files: RwLock<HashMap<String, String>>,
}

impl MemorySourceReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, path: impl Into<String>, content: impl Into<String>) {
        self.files
            .write()
            .await
            .insert(path.into(), content.into());
    }
}

#[async_trait]
impl SourceReader for MemorySourceReader {
    async fn read(&self, path: &str) -> io::Result<String> {
        self.files
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
    }
}

/// Slice an inclusive 1-indexed line range out of file content. Ranges
/// reaching past the end are cut short rather than failing.
pub(crate) fn slice_lines(content: &str, start_line: usize, end_line: usize) -> String {
    if start_line == 0 || end_line < start_line {
        return String::new();
    }
    content
        .lines()
        .skip(start_line - 1)
        .take(end_line - start_line + 1)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Language tag from a file extension, for fence labels and vector
/// metadata when the parser did not report one.
pub(crate) fn language_for_path(path: &str) -> Option<String> {
    let extension = path.rsplit_once('.')?.1;
    let language = match extension {
        "rs" => "rust",
        "py" => "python",
        "js" | "mjs" => "javascript",
        "ts" | "tsx" => "typescript",
        "go" => "go",
        "java" => "java",
        "rb" => "ruby",
        "c" | "h" => "c",
        "cpp" | "cc" | "hpp" => "cpp",
        _ => return None,
    };
    Some(language.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_slice_lines_inclusive() {
        let content = "one\ntwo\nthree\nfour";
        assert_eq!(slice_lines(content, 2, 3), "two\nthree");
        assert_eq!(slice_lines(content, 1, 1), "one");
    }

    #[test]
    fn test_slice_lines_clips_at_eof() {
        let content = "one\ntwo";
        assert_eq!(slice_lines(content, 2, 10), "two");
        assert_eq!(slice_lines(content, 5, 10), "");
    }

    #[test]
    fn test_slice_lines_rejects_bad_range() {
        assert_eq!(slice_lines("one\ntwo", 0, 1), "");
        assert_eq!(slice_lines("one\ntwo", 2, 1), "");
    }

    #[test]
    fn test_language_for_path() {
        assert_eq!(language_for_path("src/a.py").as_deref(), Some("python"));
        assert_eq!(language_for_path("src/a.rs").as_deref(), Some("rust"));
        assert_eq!(language_for_path("Makefile"), None);
        assert_eq!(language_for_path("notes.xyz"), None);
    }

    #[tokio::test]
    async fn test_memory_reader() {
        let reader = MemorySourceReader::new();
        reader.insert("a.py", "def a(): pass").await;

        assert_eq!(reader.read("a.py").await.unwrap(), "def a(): pass");
        assert_eq!(
            reader.read("missing.py").await.unwrap_err().kind(),
            std::io::ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_fs_reader() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("main.py")).unwrap();
        writeln!(file, "print('hi')").unwrap();

        let reader = FsSourceReader::new(dir.path());
        let content = reader.read("main.py").await.unwrap();
        assert_eq!(content.trim(), "print('hi')");
    }
}
