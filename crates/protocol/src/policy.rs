//! Config-level allow/block admission (spec §4.8).
//!
//! Distinct from [`crate::path_filters`], which scopes a single search query's
//! include/exclude paths. This module decides whether a path is admitted into
//! the index at all, driven by [`crate::Config::allowed_list`] /
//! [`crate::Config::block_list`].
//!
//! Matching rules, in order:
//! 1. A pattern with no glob metacharacters is a plain directory path: the
//!    target matches if it is that path or lies under it.
//! 2. `**/X/**` matches whenever `X` appears as any path component.
//! 3. `**/X` (other than the `/**` form above) matches `X` at the end of the
//!    path, or anywhere a shell glob would match it.
//! 4. Any other pattern is matched as a shell glob against the full path.
//!
//! An empty allow-list admits everything; an empty block-list blocks nothing.

use std::path::Path;

pub fn is_allowed(path: &str, allowed_list: &[String]) -> bool {
    if allowed_list.is_empty() {
        return true;
    }
    allowed_list.iter().any(|pattern| matches_pattern(path, pattern))
}

pub fn is_blocked(path: &str, block_list: &[String]) -> bool {
    block_list.iter().any(|pattern| matches_pattern(path, pattern))
}

/// True iff `path` is allowed and not blocked.
pub fn admitted(path: &str, allowed_list: &[String], block_list: &[String]) -> bool {
    is_allowed(path, allowed_list) && !is_blocked(path, block_list)
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

fn matches_pattern(path: &str, pattern: &str) -> bool {
    if !is_glob(pattern) {
        return path_within(path, pattern);
    }

    if let Some(rest) = pattern.strip_prefix("**/") {
        if let Some(dir_name) = rest.strip_suffix("/**") {
            return path_has_component(path, dir_name);
        }
        return glob::Pattern::new(&format!("*/{rest}"))
            .map(|p| p.matches(path))
            .unwrap_or(false)
            || glob::Pattern::new(rest).map(|p| p.matches(path)).unwrap_or(false);
    }

    glob::Pattern::new(pattern).map(|p| p.matches(path)).unwrap_or(false)
}

fn path_has_component(path: &str, component: &str) -> bool {
    Path::new(path)
        .components()
        .any(|c| c.as_os_str().to_str() == Some(component))
}

fn path_within(path: &str, prefix: &str) -> bool {
    let prefix = Path::new(prefix);
    Path::new(path).starts_with(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_directory_pattern_is_prefix_match() {
        let allow = vec!["/home/user/project".to_string()];
        assert!(is_allowed("/home/user/project/src/lib.rs", &allow));
        assert!(is_allowed("/home/user/project", &allow));
        assert!(!is_allowed("/home/user/project2/src/lib.rs", &allow));
    }

    #[test]
    fn node_modules_glob_matches_any_depth() {
        let block = vec!["**/node_modules/**".to_string()];
        assert!(is_blocked("/repo/node_modules/pkg/index.js", &block));
        assert!(is_blocked("/repo/a/b/node_modules/pkg/index.js", &block));
        assert!(!is_blocked("/repo/node_modules_cache/index.js", &block));
        assert!(!is_blocked("/repo/src/index.js", &block));
    }

    #[test]
    fn tail_pattern_matches_under_any_prefix() {
        let allow = vec!["**/README.md".to_string()];
        assert!(is_allowed("/a/b/README.md", &allow));
        assert!(is_allowed("README.md", &allow));
        assert!(!is_allowed("/a/b/README.md.bak", &allow));
    }

    #[test]
    fn shell_glob_matches_full_path() {
        let allow = vec!["*.rs".to_string()];
        assert!(is_allowed("main.rs", &allow));
        assert!(!is_allowed("/a/b/main.rs", &allow));

        let allow_nested = vec!["/a/b/*.rs".to_string()];
        assert!(is_allowed("/a/b/main.rs", &allow_nested));
    }

    #[test]
    fn empty_lists_allow_all_block_none() {
        assert!(admitted("/anything/at/all.rs", &[], &[]));
    }

    #[test]
    fn admitted_requires_allowed_and_not_blocked() {
        let allow = vec!["/repo".to_string()];
        let block = vec!["**/node_modules/**".to_string()];
        assert!(admitted("/repo/src/lib.rs", &allow, &block));
        assert!(!admitted("/repo/node_modules/x.js", &allow, &block));
        assert!(!admitted("/other/lib.rs", &allow, &block));
    }
}
