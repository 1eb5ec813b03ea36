//! Integration tests for cql-config.
//!
//! Exercises the whole loading pipeline: discovery, parsing, merging, and the resulting
//! parser configuration applied to real queries.

// Integration tests live outside cfg(test) by design
#![allow(clippy::tests_outside_test_module)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use cql_config::{CONFIG_FILENAME, Config, ConfigError, ConfigWarning};
use cql_parser::{AstNode, CqlVersion, ParserConfig, parse_with};

/// Temporary directory tree for a test.
struct TestEnv {
    root: tempfile::TempDir,
}

impl TestEnv {
    fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self) -> &Path {
        self.root.path()
    }

    /// Creates a directory and returns its path.
    fn create_dir(&self, rel_path: &str) -> PathBuf {
        let path = self.root.path().join(rel_path);
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// Writes a config file into `rel_dir` and returns its path.
    fn write_config(&self, rel_dir: &str, content: &str) -> PathBuf {
        let path = self.create_dir(rel_dir).join(CONFIG_FILENAME);
        fs::write(&path, content).unwrap();
        path
    }
}

#[test]
fn root_config_alone() {
    let env = TestEnv::new();
    let file = env.write_config(
        "",
        r#"
root = true

[parser]
error_on_duplicate_prefix = true
"#,
    );

    let config = Config::load(env.path()).unwrap();
    assert_eq!(config.files, vec![file]);
    assert!(config.settings.error_on_duplicate_prefix);
    assert_eq!(config.settings.version, CqlVersion::V1_2);
    assert!(config.prefixes.is_empty());
    assert!(config.config_root.is_some());
}

#[test]
fn nested_configs_merge() {
    let env = TestEnv::new();
    env.write_config(
        "",
        r#"
root = true

[parser]
version = "1.1"
max_depth = 64

[prefixes]
dc = "urn:outer-dc"
bath = "urn:bath"
"#,
    );
    env.write_config(
        "project",
        r#"
[parser]
max_depth = 8

[prefixes]
dc = "urn:inner-dc"
"#,
    );
    let cwd = env.create_dir("project/src");

    let config = Config::load(&cwd).unwrap();
    assert_eq!(config.files.len(), 2);
    assert_eq!(config.settings.version, CqlVersion::V1_1);
    assert_eq!(config.settings.max_depth, 8);
    assert_eq!(config.prefixes["dc"], "urn:inner-dc");
    assert_eq!(config.prefixes["bath"], "urn:bath");
}

#[test]
fn loaded_config_drives_the_parser() {
    let env = TestEnv::new();
    env.write_config(
        "",
        r#"
root = true

[parser]
version = "1.1"
error_on_empty_term = true

[prefixes]
DC = "http://purl.org/dc/elements/1.1/"
"#,
    );

    let parser = Config::load(env.path()).unwrap().parser_config();

    let query = parse_with("fish", &parser).unwrap();
    assert_eq!(query.to_cql(), "cql.serverchoice scr \"fish\"");

    let query = parse_with("dc.title = x", &parser).unwrap();
    assert_eq!(
        query.root().index_uri(),
        Some("http://purl.org/dc/elements/1.1/")
    );

    let err = parse_with("title = \"\"", &parser).unwrap_err();
    assert_eq!(err.code(), 27);
}

#[test]
fn invalid_toml_is_reported_with_path() {
    let env = TestEnv::new();
    let file = env.write_config("", "root = true\n[parser\n");

    let err = Config::load(env.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ParseToml { ref path, .. } if *path == file));
}

#[test]
fn invalid_version_is_reported() {
    let env = TestEnv::new();
    env.write_config("", "root = true\n[parser]\nversion = \"2.0\"\n");

    let err = Config::load(env.path()).unwrap_err();
    assert!(err.to_string().contains("parser.version"));
    assert!(err.to_string().contains("2.0"));
}

#[test]
fn load_from_files_respects_order() {
    let env = TestEnv::new();
    let first = env.write_config("a", "[parser]\nmax_depth = 1\n");
    let second = env.write_config("b", "[parser]\nmax_depth = 2\n");

    let config = Config::load_from_files(&[second.clone(), first.clone()]).unwrap();
    assert_eq!(config.settings.max_depth, 2);

    let config = Config::load_from_files(&[first, second]).unwrap();
    assert_eq!(config.settings.max_depth, 1);
}

#[test]
fn load_from_no_files_is_default() {
    let config = Config::load_from_files(&[]).unwrap();
    assert!(config.files.is_empty());
    assert_eq!(config.parser_config(), ParserConfig::default());
}

#[test]
fn validation_warnings() {
    let env = TestEnv::new();
    env.write_config(
        "",
        r#"
root = true

[parser]
max_depth = 0

[prefixes]
srw = "urn:not-allowed"
"#,
    );

    let warnings = Config::load(env.path()).unwrap().validate();
    assert!(warnings.contains(&ConfigWarning::ZeroMaxDepth));
    assert!(warnings.contains(&ConfigWarning::ReservedPrefixShadowed { name: "srw".into() }));
}
