use crate::error::{ArchError, Result};
use glob::Pattern;
use std::path::{Component, Path};

/// 路径 glob，从右往左逐段匹配
///
/// 相对模式匹配路径末尾的若干段 (`__init__.py` 命中 `pkg/__init__.py`)，
/// 绝对模式必须覆盖整条路径。
#[derive(Debug, Clone)]
pub struct PathGlob {
    source: String,
    absolute: bool,
    parts: Vec<Pattern>,
}

impl PathGlob {
    pub fn new(pattern: &str) -> Result<Self> {
        let invalid = |reason: String| ArchError::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        };

        let (absolute, segments) = split_path(Path::new(pattern));
        if segments.is_empty() {
            return Err(invalid("empty pattern".to_string()));
        }

        let parts = segments
            .iter()
            .map(|s| Pattern::new(s).map_err(|e| invalid(e.to_string())))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            source: pattern.to_string(),
            absolute,
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, path: &str) -> bool {
        let (absolute, segments) = split_path(Path::new(path));

        if self.absolute {
            if !absolute || segments.len() != self.parts.len() {
                return false;
            }
        } else if segments.len() < self.parts.len() {
            return false;
        }

        segments
            .iter()
            .rev()
            .zip(self.parts.iter().rev())
            .all(|(segment, part)| part.matches(segment))
    }
}

/// 任一 glob 命中即为真
pub fn matches_any(globs: &[PathGlob], path: &str) -> bool {
    globs.iter().any(|g| g.matches(path))
}

pub fn compile_all(patterns: &[String]) -> Result<Vec<PathGlob>> {
    patterns.iter().map(|p| PathGlob::new(p)).collect()
}

fn split_path(path: &Path) -> (bool, Vec<String>) {
    let mut absolute = false;
    let mut segments = Vec::new();

    for component in path.components() {
        match component {
            Component::RootDir | Component::Prefix(_) => absolute = true,
            Component::CurDir => {}
            other => segments.push(other.as_os_str().to_string_lossy().into_owned()),
        }
    }

    (absolute, segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glob(pattern: &str) -> PathGlob {
        PathGlob::new(pattern).unwrap()
    }

    #[test]
    fn test_relative_pattern_matches_tail() {
        assert!(glob("__init__.py").matches("pkg/sub/__init__.py"));
        assert!(glob("*.py").matches("pkg/mod.py"));
        assert!(glob("tests/*").matches("proj/tests/test_a.py"));
        assert!(!glob("tests/*").matches("proj/src/a.py"));
        assert!(!glob("__init__.py").matches("pkg/mod.py"));
    }

    #[test]
    fn test_pattern_longer_than_path_fails() {
        assert!(!glob("a/b/c.py").matches("c.py"));
    }

    #[test]
    fn test_absolute_pattern_matches_whole_path() {
        assert!(glob("/src/*/mod.py").matches("/src/pkg/mod.py"));
        assert!(!glob("/src/*/mod.py").matches("/root/src/pkg/mod.py"));
        assert!(!glob("/src/*/mod.py").matches("src/pkg/mod.py"));
    }

    #[test]
    fn test_plain_names_match_like_paths() {
        assert!(glob("Component_A").matches("Component_A"));
        assert!(glob("Component_*").matches("Component_E"));
        assert!(!glob("Component_A").matches("Component_B"));
    }

    #[test]
    fn test_cur_dir_ignored() {
        assert!(glob("pkg/*.py").matches("./pkg/a.py"));
    }

    #[test]
    fn test_invalid_patterns_rejected() {
        assert!(matches!(PathGlob::new(""), Err(ArchError::InvalidPattern { .. })));
        assert!(matches!(PathGlob::new("[a"), Err(ArchError::InvalidPattern { .. })));
    }

    #[test]
    fn test_matches_any() {
        let globs = compile_all(&["*/migrations/*".to_string(), "__init__.py".to_string()]).unwrap();
        assert!(matches_any(&globs, "app/migrations/0001.py"));
        assert!(matches_any(&globs, "app/__init__.py"));
        assert!(!matches_any(&globs, "app/models.py"));
    }
}
