//! Filesystem-safe filenames

use std::sync::LazyLock;

use regex::Regex;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_.\-]").expect("valid regex"));

/// Replace every character outside `[a-zA-Z0-9_.-]` with `_`
///
/// One output character per input character, so positions line up with the
/// original name.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    UNSAFE_CHARS.replace_all(name, "_").into_owned()
}
