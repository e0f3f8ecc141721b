use std::cmp::Ordering;
use std::sync::OnceLock;

use regex::Regex;

fn digit_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("static regex"))
}

/// Every run of digits in `name`, as integers, in order of appearance.
///
/// Runs too long for a `u64` saturate rather than fail.
pub fn numeric_key(name: &str) -> Vec<u64> {
    digit_runs()
        .find_iter(name)
        .map(|m| m.as_str().parse::<u64>().unwrap_or(u64::MAX))
        .collect()
}

/// Orders filenames by their numeric key, then by the name itself.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    numeric_key(a)
        .cmp(&numeric_key(b))
        .then_with(|| a.cmp(b))
}

/// The catalogue id embedded in an image filename.
///
/// Names with an underscore carry the id as their leading digits
/// (`1234_05.png` → `1234`); otherwise every digit of the stem is kept
/// (`item-0042.png` → `0042`).
pub fn leading_numeric_id(filename: &str) -> Option<String> {
    let stem = match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    };
    let id: String = if stem.contains('_') {
        stem.chars().take_while(|c| c.is_ascii_digit()).collect()
    } else {
        stem.chars().filter(|c| c.is_ascii_digit()).collect()
    };
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}
