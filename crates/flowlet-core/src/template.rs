// Template substitution for loop workflows.
//
// Runs inside replay-sensitive workflow code, so it must stay pure:
// deterministic output for identical inputs, no side effects.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::item::LoopItem;

/// `{{ item.<field> }}` with optional inner whitespace.
static ITEM_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*item\.([a-zA-Z0-9_]+)\s*\}\}").expect("valid item-field regex"));

/// Render a text template for one loop iteration.
///
/// Token classes, each applied in a single left-to-right pass (no recursive
/// substitution; every occurrence of a token is replaced):
/// - `{{ increment by one each loop }}` -> decimal `index + 1`
/// - `{{i}}` -> decimal `index`
/// - `{{index1}}` -> decimal `index + 1`
/// - `{{ item.<field> }}` -> string form of the item field, empty string
///   when the field is absent or null
pub fn render(template: &str, index: usize, item: &LoopItem) -> String {
    let mut out = template.to_string();
    out = out.replace("{{ increment by one each loop }}", &(index + 1).to_string());
    out = out.replace("{{i}}", &index.to_string());
    out = out.replace("{{index1}}", &(index + 1).to_string());

    ITEM_FIELD
        .replace_all(&out, |caps: &regex::Captures<'_>| {
            item.field_text(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}
