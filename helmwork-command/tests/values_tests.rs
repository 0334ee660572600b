//! Value source resolution against real files.

use std::collections::BTreeMap;
use std::fs;

use helmwork_command::values::{self, ValueSource};
use helmwork_command::{CommandError, InvocationBuilder};
use rstest::rstest;
use serde_yaml::{Mapping, Value};
use tempfile::TempDir;

fn yaml(text: &str) -> Mapping {
    serde_yaml::from_str(text).unwrap()
}

#[test]
fn files_merge_in_order_then_inline_wins() {
    let tmp = TempDir::new().unwrap();
    let base = tmp.path().join("base.yaml");
    let prod = tmp.path().join("prod.yaml");
    fs::write(&base, "image: {repo: app, tag: v1}\nports: [80, 443]\nreplicas: 1\n").unwrap();
    fs::write(&prod, "image: {tag: v2}\nports: [8080]\n").unwrap();

    let mut inline = BTreeMap::new();
    inline.insert("replicas".to_string(), Value::from(3));
    inline.insert("image.pullPolicy".to_string(), Value::from("Always"));

    let merged = values::resolve(&ValueSource::new(inline, vec![base, prod])).unwrap();
    assert_eq!(
        merged,
        yaml("image: {repo: app, tag: v2, pullPolicy: Always}\nports: [8080]\nreplicas: 3\n")
    );
}

#[rstest]
#[case("", true)]
#[case("# only a comment\n", true)]
#[case("- a\n- b\n", false)]
#[case("just a string\n", false)]
#[case("a: [unclosed\n", false)]
fn file_top_level_shapes(#[case] contents: &str, #[case] accepted: bool) {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("values.yaml");
    fs::write(&file, contents).unwrap();
    let result = values::resolve(&ValueSource::new(BTreeMap::new(), vec![file]));
    match result {
        Ok(merged) => {
            assert!(accepted, "expected rejection of {contents:?}");
            assert!(merged.is_empty());
        }
        Err(err) => {
            assert!(!accepted, "unexpected error: {err}");
            assert!(matches!(err, CommandError::SourceUnreadable { .. }));
        }
    }
}

#[test]
fn same_values_give_same_values_file() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("v.yaml");
    fs::write(&file, "b: 2\na: 1\n").unwrap();
    let source = ValueSource::new(BTreeMap::new(), vec![file]);
    let values_dir = tmp.path().join("out");

    let build = || {
        InvocationBuilder::new("helm", "lint")
            .values(&source, &values_dir)
            .arg("chart", Some("/c"))
            .build()
            .unwrap()
            .args
    };
    let first = build();
    let second = build();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&first[2]).unwrap(), "a: 1\nb: 2\n");
    assert_eq!(fs::read_dir(&values_dir).unwrap().count(), 1);
}

#[test]
fn too_many_inline_leaves_fall_back_to_a_file() {
    let tmp = TempDir::new().unwrap();
    let inline: BTreeMap<String, Value> = (0..=helmwork_command::INLINE_SET_LIMIT)
        .map(|i| (format!("k{i}"), Value::from(i as u64)))
        .collect();
    let args = InvocationBuilder::new("helm", "lint")
        .values(&ValueSource::new(inline, vec![]), tmp.path())
        .arg("chart", Some("/c"))
        .build()
        .unwrap()
        .args;
    assert_eq!(args[1], "--values");
    assert_eq!(args.len(), 4);
}

#[test]
fn later_file_wins_and_inline_wins_over_files() {
    let tmp = TempDir::new().unwrap();
    let first = tmp.path().join("1.yaml");
    let second = tmp.path().join("2.yaml");
    fs::write(&first, "a: {x: 1}\n").unwrap();
    fs::write(&second, "a: {x: 2, y: 3}\n").unwrap();
    let mut inline = BTreeMap::new();
    inline.insert("a".to_string(), Value::Mapping(yaml("y: 4")));

    let merged = values::resolve(&ValueSource::new(inline, vec![first, second])).unwrap();
    assert_eq!(merged, yaml("a: {x: 2, y: 4}"));
}

#[test]
fn five_inline_keys_build_identically_every_time() {
    let tmp = TempDir::new().unwrap();
    let inline: BTreeMap<String, Value> = [
        ("image.tag", Value::from("v1")),
        ("replicas", Value::from(2)),
        ("debug", Value::from(true)),
        ("service.port", Value::from(8080)),
        ("name", Value::from("web")),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    let source = ValueSource::new(inline, vec![]);

    let build = || {
        InvocationBuilder::new("helm", "lint")
            .flag("--strict", Some(true))
            .values(&source, tmp.path())
            .arg("chart", Some("/c"))
            .build()
            .unwrap()
            .args
    };
    let args = build();
    assert_eq!(args, build());
    assert_eq!(
        args,
        vec![
            "lint",
            "--strict",
            "--set",
            "debug=true",
            "--set-string",
            "image.tag=v1",
            "--set-string",
            "name=web",
            "--set",
            "replicas=2",
            "--set",
            "service.port=8080",
            "/c",
        ]
    );
}
