/// Reduce a free-text title to a comparable form.
///
/// Lower-cases, drops everything that is not an ASCII word character or
/// whitespace, collapses whitespace runs to a single space and trims.
/// `None` and empty input both yield an empty string.
pub fn normalize_title<'a>(title: impl Into<Option<&'a str>>) -> String {
    let Some(title) = title.into() else {
        return String::new();
    };

    let mut out = String::with_capacity(title.len());
    let mut pending_space = false;

    for c in title.to_lowercase().chars() {
        if c.is_whitespace() {
            pending_space = true;
        } else if c.is_ascii_alphanumeric() || c == '_' {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        }
    }

    out
}

/// Decides whether two catalog titles name the same game.
pub trait TitleMatcher: Send + Sync {
    fn matches(&self, a: &str, b: &str) -> bool;
}

/// Normalized equality, or containment where the shorter title anchors
/// the start or the end of the longer one.
///
/// Known to over-match titles that are a prefix or suffix of an unrelated
/// title ("Dark" vs "Darkest Dungeon").
#[derive(Debug, Default, Clone, Copy)]
pub struct AnchoredMatcher;

impl TitleMatcher for AnchoredMatcher {
    fn matches(&self, a: &str, b: &str) -> bool {
        titles_match(a, b)
    }
}

pub fn titles_match<'a, 'b>(a: impl Into<Option<&'a str>>, b: impl Into<Option<&'b str>>) -> bool {
    let a = normalize_title(a);
    let b = normalize_title(b);

    // empty would otherwise be a substring of everything
    if a.is_empty() || b.is_empty() {
        return false;
    }

    if a == b {
        return true;
    }

    let (longer, shorter) = if a.len() > b.len() { (&a, &b) } else { (&b, &a) };

    longer.contains(shorter.as_str())
        && (longer.starts_with(shorter.as_str()) || longer.ends_with(shorter.as_str()))
}
