//! Fixture-driven tests.
//!
//! Every `test/good/*.yaml` file must compose into node graphs without
//! error. Every `test/bad/*.yaml` file must fail, and its error message
//! must contain the text of the sibling `.error` file.

use glob::glob;
use libyarrow::{compose_all_with, Options};
use std::fs;
use std::path::{Path, PathBuf};

/// Root test directory, shared by the workspace.
fn test_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("test")
}

fn fixture_paths(subdir: &str) -> Vec<PathBuf> {
    let pattern = test_root().join(subdir).join("*.yaml");
    let mut paths: Vec<PathBuf> = glob(pattern.to_str().unwrap())
        .unwrap()
        .map(|entry| entry.unwrap())
        .collect();
    paths.sort();
    paths
}

#[test]
fn test_good_fixtures_compose() {
    let paths = fixture_paths("good");
    assert!(!paths.is_empty(), "no good fixtures found");
    for path in paths {
        let name = path.to_string_lossy();
        let source = fs::read_to_string(&path).unwrap();
        if let Err(e) = compose_all_with(&source, Some(&name), Options::default()) {
            panic!("{} failed to compose:\n{}", name, e);
        }
    }
}

#[test]
fn test_bad_fixtures_fail_with_expected_error() {
    let paths = fixture_paths("bad");
    assert!(!paths.is_empty(), "no bad fixtures found");
    for path in paths {
        let name = path.to_string_lossy().to_string();
        let source = fs::read_to_string(&path).unwrap();
        let expected = fs::read_to_string(path.with_extension("error"))
            .unwrap_or_else(|_| panic!("{} has no .error file", name));
        let expected = expected.trim();
        match compose_all_with(&source, Some(&name), Options::default()) {
            Ok(_) => panic!("{} composed but was expected to fail", name),
            Err(e) => {
                let message = e.to_string();
                assert!(
                    message.contains(expected),
                    "{} failed with:\n{}\nexpected the message to contain:\n{}",
                    name,
                    message,
                    expected
                );
            }
        }
    }
}

#[test]
fn test_error_messages_name_the_file() {
    let path = test_root().join("bad").join("undefined-alias.yaml");
    let source = fs::read_to_string(&path).unwrap();
    let err = compose_all_with(&source, Some("undefined-alias.yaml"), Options::default())
        .unwrap_err();
    assert!(err.to_string().contains("in \"undefined-alias.yaml\""));
}
