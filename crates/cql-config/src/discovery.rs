//! Configuration file discovery.
//!
//! Collects `.cql.toml` files from the working directory upwards, then the global
//! `~/.cql.toml`, in precedence order.

use std::path::{Path, PathBuf};

use directories::BaseDirs;
use tracing::debug;

use crate::parse::is_root_config;

/// The configuration filename.
pub const CONFIG_FILENAME: &str = ".cql.toml";

/// Discovers all configuration files that apply to `cwd`.
///
/// Paths come back closest first, global last. A file declaring `root = true` ends the walk
/// and also suppresses the global file.
pub fn discover_config_files(cwd: &Path) -> Vec<PathBuf> {
    let mut configs = Vec::new();

    for dir in cwd.ancestors() {
        let candidate = dir.join(CONFIG_FILENAME);
        if !candidate.is_file() {
            continue;
        }
        debug!(path = %candidate.display(), "found config file");
        let stop = is_root_config(&candidate);
        configs.push(candidate);
        if stop {
            debug!("root config reached, skipping parents and global config");
            return configs;
        }
    }

    if let Some(global) = global_config_path()
        && global.is_file()
        && !configs.contains(&global)
    {
        debug!(path = %global.display(), "found global config file");
        configs.push(global);
    }

    configs
}

/// Returns the path of the global configuration file (`~/.cql.toml`).
pub fn global_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().join(CONFIG_FILENAME))
}

/// Returns true if `path` is the global configuration file.
pub fn is_global_config(path: &Path) -> bool {
    global_config_path().is_some_and(|global| path == global)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::test_support::TestDir;

    /// Drops the global config, which depends on the machine running the tests.
    fn local(configs: Vec<PathBuf>) -> Vec<PathBuf> {
        configs
            .into_iter()
            .filter(|p| !is_global_config(p))
            .collect()
    }

    #[test]
    fn nothing_found() {
        let dir = TestDir::new();
        let deep = dir.create_dir("x/y/z");
        assert!(local(discover_config_files(&deep)).is_empty());
    }

    #[test]
    fn closest_first() {
        let dir = TestDir::new();
        let top = dir.create_config_at_root();
        let middle = dir.create_config("a");
        let bottom = dir.create_config("a/b/c");
        let cwd = dir.create_dir("a/b/c/d");

        assert_eq!(local(discover_config_files(&cwd)), vec![bottom, middle, top]);
    }

    #[test]
    fn config_in_cwd_is_found() {
        let dir = TestDir::new();
        let config = dir.create_config_at_root();
        assert_eq!(local(discover_config_files(dir.path())), vec![config]);
    }

    #[test]
    fn directories_named_like_configs_are_skipped() {
        let dir = TestDir::new();
        fs::create_dir_all(dir.path().join(CONFIG_FILENAME)).unwrap();
        let cwd = dir.create_dir("sub");
        assert!(local(discover_config_files(&cwd)).is_empty());
    }

    #[test]
    fn root_config_stops_walk() {
        let dir = TestDir::new();
        dir.create_config_at_root();
        let project = dir.create_root_config("project");
        let nested = dir.create_config("project/crate");
        let cwd = dir.create_dir("project/crate/src");

        // No filtering: the global file must be absent too.
        assert_eq!(discover_config_files(&cwd), vec![nested, project]);
    }

    #[test]
    fn root_false_keeps_walking() {
        let dir = TestDir::new();
        let top = dir.create_config_at_root();
        let project = dir.create_config_with_content("project", "root = false\n");
        let cwd = dir.create_dir("project/src");

        assert_eq!(local(discover_config_files(&cwd)), vec![project, top]);
    }

    #[test]
    fn global_path_uses_config_filename() {
        let path = global_config_path().unwrap();
        assert!(path.ends_with(CONFIG_FILENAME));
        assert!(is_global_config(&path));
        assert!(!is_global_config(Path::new("/elsewhere/.cql.toml")));
    }
}
