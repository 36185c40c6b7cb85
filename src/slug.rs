/// Derive a URL-safe lowercase identifier from a display name.
///
/// Keeps ASCII alphanumerics, collapses every other run of characters
/// into a single hyphen, and trims hyphens from both ends.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn lowercases_and_hyphenates() {
        assert_eq!(slugify("Maple Syrup"), "maple-syrup");
        assert_eq!(slugify("ACME Wrench 3000"), "acme-wrench-3000");
    }

    #[test]
    fn collapses_punctuation_runs() {
        assert_eq!(slugify("Bolts, nuts & washers"), "bolts-nuts-washers");
    }

    #[test]
    fn trims_leading_and_trailing_separators() {
        assert_eq!(slugify("  --Stock Alert--  "), "stock-alert");
        assert_eq!(slugify("!!!"), "");
    }
}
