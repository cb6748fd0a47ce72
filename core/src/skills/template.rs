use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();

fn placeholder_regex() -> &'static Regex {
    PLACEHOLDER_REGEX.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").expect("PLACEHOLDER_REGEX is valid")
    })
}

/// Substitute `{{name}}` placeholders in one pass.
///
/// `input` and `selection` are reserved; other names resolve from
/// `metadata`. Unknown placeholders are left as written, and text pulled in
/// from a value is never expanded again.
pub fn render_template(
    template: &str,
    input: &str,
    selection: Option<&str>,
    metadata: &BTreeMap<String, String>,
) -> String {
    placeholder_regex()
        .replace_all(template, |caps: &Captures<'_>| {
            let name = &caps[1];
            match name {
                "input" => input.to_string(),
                "selection" => selection.unwrap_or(input).to_string(),
                _ => metadata
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string()),
            }
        })
        .into_owned()
}

/// Placeholder names used by a template, in order of first appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for caps in placeholder_regex().captures_iter(template) {
        let name = caps[1].to_string();
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}
