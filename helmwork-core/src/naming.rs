//! Capitalisation helpers used to embed entity names in task names.

/// Upper-case the first character, leave the rest untouched.
///
/// `"foo"` → `"Foo"`, `"fooBar"` → `"FooBar"`, `"1st"` → `"1st"`.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Split on every non-alphanumeric character, capitalise each word, join.
///
/// `"my-app"` → `"MyApp"`, `"api_gateway.v2"` → `"ApiGatewayV2"`.
pub fn capitalize_words(s: &str) -> String {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect()
}
