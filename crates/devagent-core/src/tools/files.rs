//! Local file system tools

use super::{shell, CommandOutput, ToolCapabilities, ToolError};
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Directories never reported by `find_files`
const IGNORED_DIRS: &[&str] = &["node_modules", "target", "__pycache__", "dist", "build"];

/// Tools backed by the real file system and shell, rooted at a workspace
#[derive(Debug, Clone)]
pub struct LocalTools {
    root: PathBuf,
}

impl LocalTools {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = normalize(&root.into());
        let root = root.canonicalize().unwrap_or(root);
        Self { root }
    }

    /// Resolve a workspace path, refusing anything that escapes the root
    fn resolve(&self, path: &str) -> Result<PathBuf, ToolError> {
        let candidate = Path::new(path);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        };

        let resolved = normalize(&joined);
        if resolved.starts_with(&self.root) && !escapes(&joined) && self.stays_inside(&resolved) {
            Ok(resolved)
        } else {
            Err(ToolError::OutsideWorkspace(path.to_string()))
        }
    }

    /// Follow symlinks on the deepest existing part of `path`; it must land under the root
    fn stays_inside(&self, path: &Path) -> bool {
        let Some(existing) = path
            .ancestors()
            .find(|p| p.symlink_metadata().is_ok())
        else {
            return true;
        };
        if !existing.starts_with(&self.root) {
            // root itself is missing; nothing inside can be a link yet
            return true;
        }
        match existing.canonicalize() {
            Ok(real) => real.starts_with(&self.root),
            Err(err) => {
                tracing::debug!(path = %existing.display(), error = %err, "cannot canonicalize");
                false
            }
        }
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        Some(parts.join("/"))
    }
}

/// Lexically normalize `.` and `..` components
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// True when `..` would climb above the filesystem root
fn escapes(path: &Path) -> bool {
    let mut depth: usize = 0;
    for component in path.components() {
        match component {
            Component::ParentDir => {
                if depth == 0 {
                    return true;
                }
                depth -= 1;
            }
            Component::Normal(_) => depth += 1,
            _ => {}
        }
    }
    false
}

fn is_ignored(relative: &str) -> bool {
    relative
        .split('/')
        .any(|part| part.starts_with('.') || IGNORED_DIRS.contains(&part))
}

impl ToolCapabilities for LocalTools {
    fn root(&self) -> &Path {
        &self.root
    }

    fn read_file(&self, path: &str) -> Result<String, ToolError> {
        let resolved = self.resolve(path)?;
        std::fs::read_to_string(&resolved).map_err(|e| ToolError::io(path, e))
    }

    fn write_file(&self, path: &str, content: &str) -> Result<(), ToolError> {
        let resolved = self.resolve(path)?;
        if let Some(parent) = resolved.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ToolError::io(path, e))?;
        }
        std::fs::write(&resolved, content).map_err(|e| ToolError::io(path, e))?;
        tracing::debug!(path, bytes = content.len(), "wrote file");
        Ok(())
    }

    fn find_files(&self, pattern: &str) -> Result<Vec<String>, ToolError> {
        if Path::new(pattern).is_absolute() || pattern.split('/').any(|part| part == "..") {
            return Err(ToolError::OutsideWorkspace(pattern.to_string()));
        }

        let full = self.root.join(pattern);
        let entries = glob::glob(&full.to_string_lossy()).map_err(|e| ToolError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        let mut files: Vec<String> = entries
            .flatten()
            .filter(|path| path.is_file())
            .filter_map(|path| self.relative(&path))
            .filter(|relative| !is_ignored(relative))
            .filter(|relative| self.resolve(relative).is_ok())
            .collect();
        files.sort();
        files.dedup();
        Ok(files)
    }

    fn search_pattern(&self, pattern: &str, path: &str) -> Result<Vec<String>, ToolError> {
        let regex = Regex::new(pattern).map_err(|e| ToolError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        let content = self.read_file(path)?;

        Ok(content
            .lines()
            .enumerate()
            .filter(|(_, line)| regex.is_match(line))
            .map(|(i, line)| format!("{}: {}", i + 1, line.trim_end()))
            .collect())
    }

    fn run_command(&self, command: &str, timeout: Duration) -> Result<CommandOutput, ToolError> {
        shell::run_command(&self.root, command, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn workspace() -> (TempDir, LocalTools) {
        let dir = TempDir::new().unwrap();
        let tools = LocalTools::new(dir.path());
        (dir, tools)
    }

    #[test]
    fn test_write_then_read_creates_parents() {
        let (_dir, tools) = workspace();
        tools.write_file("src/nested/lib.rs", "pub fn a() {}\n").unwrap();
        assert_eq!(tools.read_file("src/nested/lib.rs").unwrap(), "pub fn a() {}\n");
    }

    #[test]
    fn test_paths_outside_root_are_refused() {
        let (_dir, tools) = workspace();
        assert!(matches!(
            tools.read_file("../secret.txt"),
            Err(ToolError::OutsideWorkspace(_))
        ));
        assert!(matches!(
            tools.write_file("/etc/devagent-test", "x"),
            Err(ToolError::OutsideWorkspace(_))
        ));
        assert!(matches!(
            tools.find_files("../**/*.rs"),
            Err(ToolError::OutsideWorkspace(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_out_of_root_is_refused() {
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "hidden").unwrap();
        let (dir, tools) = workspace();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("escape")).unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("gone.txt"),
            dir.path().join("dangling.txt"),
        )
        .unwrap();

        assert!(matches!(
            tools.read_file("escape/secret.txt"),
            Err(ToolError::OutsideWorkspace(_))
        ));
        assert!(matches!(
            tools.write_file("escape/new.txt", "x"),
            Err(ToolError::OutsideWorkspace(_))
        ));
        assert!(matches!(
            tools.write_file("dangling.txt", "x"),
            Err(ToolError::OutsideWorkspace(_))
        ));
        assert!(!outside.path().join("new.txt").exists());
        assert!(!outside.path().join("gone.txt").exists());
        assert_eq!(tools.find_files("**/*.txt").unwrap(), Vec::<String>::new());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_within_root_is_allowed() {
        let (dir, tools) = workspace();
        tools.write_file("real/a.txt", "a").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("alias")).unwrap();
        assert_eq!(tools.read_file("alias/a.txt").unwrap(), "a");
    }

    #[test]
    fn test_dotdot_inside_root_is_allowed() {
        let (_dir, tools) = workspace();
        tools.write_file("a/../b.txt", "b").unwrap();
        assert_eq!(tools.read_file("b.txt").unwrap(), "b");
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let (_dir, tools) = workspace();
        assert_eq!(
            tools.read_file("nope.rs"),
            Err(ToolError::NotFound("nope.rs".to_string()))
        );
    }

    #[test]
    fn test_find_files_skips_ignored_dirs() {
        let (_dir, tools) = workspace();
        tools.write_file("src/main.rs", "").unwrap();
        tools.write_file("src/lib.rs", "").unwrap();
        tools.write_file("target/debug/build.rs", "").unwrap();
        tools.write_file(".git/hooks/x.rs", "").unwrap();

        assert_eq!(
            tools.find_files("**/*.rs").unwrap(),
            vec!["src/lib.rs".to_string(), "src/main.rs".to_string()]
        );
    }

    #[test]
    fn test_search_pattern_reports_line_numbers() {
        let (_dir, tools) = workspace();
        tools
            .write_file("src/lib.rs", "fn parse() {}\nfn render() {}\nfn parse_all() {}\n")
            .unwrap();

        assert_eq!(
            tools.search_pattern(r"fn parse", "src/lib.rs").unwrap(),
            vec!["1: fn parse() {}".to_string(), "3: fn parse_all() {}".to_string()]
        );
        assert!(matches!(
            tools.search_pattern("(", "src/lib.rs"),
            Err(ToolError::InvalidPattern { .. })
        ));
    }
}
