//! YAML value trees: deep merge and dotted-key expansion.
//!
//! Nested mappings merge key by key; scalars, sequences and null are replaced
//! wholesale by the later layer. A dotted key (`image.tag`) addresses the same
//! nested path as `image: {tag: ..}`.

use std::collections::BTreeMap;

use serde_yaml::{Mapping, Value};

/// Merge `overlay` into `base`.
pub fn deep_merge(base: &mut Mapping, overlay: Mapping) {
    for (key, value) in overlay {
        match value {
            Value::Mapping(incoming) => {
                if let Some(Value::Mapping(existing)) = base.get_mut(&key) {
                    deep_merge(existing, incoming);
                    continue;
                }
                base.insert(key, Value::Mapping(incoming));
            }
            other => {
                base.insert(key, other);
            }
        }
    }
}

/// Turn `{"image.tag": v}` into `{image: {tag: v}}`.
///
/// Within one map a dotted key sorts after its prefix (`image` < `image.tag`),
/// so the dotted entry wins over a nested one addressing the same leaf.
pub fn expand_dotted(entries: &BTreeMap<String, Value>) -> Mapping {
    let mut expanded = Mapping::new();
    for (key, value) in entries {
        let mut nested = value.clone();
        for segment in key.rsplit('.') {
            let mut level = Mapping::new();
            level.insert(Value::String(segment.to_string()), nested);
            nested = Value::Mapping(level);
        }
        if let Value::Mapping(level) = nested {
            deep_merge(&mut expanded, level);
        }
    }
    expanded
}

/// Fold value maps from the outermost scope to the innermost.
///
/// Each layer is expanded before it is merged, so an inner scope wins over an
/// outer one however either spells the key.
pub fn layer(layers: Vec<BTreeMap<String, Value>>) -> BTreeMap<String, Value> {
    let mut merged = Mapping::new();
    for entries in &layers {
        deep_merge(&mut merged, expand_dotted(entries));
    }
    merged
        .into_iter()
        .filter_map(|(key, value)| match key {
            Value::String(key) => Some((key, value)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Mapping {
        serde_yaml::from_str(s).unwrap()
    }

    fn entries(s: &str) -> BTreeMap<String, Value> {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn deep_merge_recurses_into_mappings() {
        let mut base = yaml("a: {x: 1, y: 1}\nb: keep\n");
        deep_merge(&mut base, yaml("a: {y: 2, z: 3}\n"));
        assert_eq!(base, yaml("a: {x: 1, y: 2, z: 3}\nb: keep\n"));
    }

    #[test]
    fn deep_merge_replaces_lists_wholesale() {
        let mut base = yaml("hosts: [a, b, c]\n");
        deep_merge(&mut base, yaml("hosts: [d]\n"));
        assert_eq!(base, yaml("hosts: [d]\n"));
    }

    #[test]
    fn deep_merge_scalar_replaces_mapping() {
        let mut base = yaml("a: {x: 1}\n");
        deep_merge(&mut base, yaml("a: off\n"));
        assert_eq!(base, yaml("a: off\n"));
    }

    #[test]
    fn dotted_key_wins_within_one_map() {
        let expanded = expand_dotted(&entries("image: {tag: nested}\nimage.tag: dotted\n"));
        assert_eq!(expanded, yaml("image: {tag: dotted}\n"));
    }

    #[test]
    fn inner_nested_key_wins_over_outer_dotted_key() {
        let merged = layer(vec![
            entries("image.tag: parent\n"),
            entries("image: {tag: child}\n"),
        ]);
        assert_eq!(merged, entries("image: {tag: child}\n"));
    }

    #[test]
    fn inner_dotted_key_keeps_outer_siblings() {
        let merged = layer(vec![
            entries("image: {tag: parent, pullPolicy: Always}\n"),
            entries("image.tag: child\n"),
        ]);
        assert_eq!(merged, entries("image: {tag: child, pullPolicy: Always}\n"));
    }
}
