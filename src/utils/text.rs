//! Text processing utilities

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// `**bold**`, `__bold__`, `*em*`; single `_` is left alone for snake_case
    static ref EMPHASIS: Regex = Regex::new(
        r"\*\*([^*\s](?:[^*]*?[^*\s])?)\*\*|__([^_\s](?:[^_]*?[^_\s])?)__|\*([^*\s](?:[^*]*?[^*\s])?)\*"
    )
    .unwrap();
}

/// Truncate text to at most `max_chars` characters, appending `marker` when cut.
///
/// Counts characters, not bytes, so multi-byte content never splits a code point.
pub fn truncate_with_marker(text: &str, max_chars: usize, marker: &str) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((byte_index, _)) => format!("{}{}", &text[..byte_index], marker),
    }
}

/// Code fence language tag for a path: the extension, or `text` without one
pub fn language_tag(path: &str) -> &str {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext,
        _ => "text",
    }
}

/// Strip emphasis markup, keeping the wrapped text.
///
/// Delimiters glued to a word character (`a*b*c`, `x__y__`) are not markup.
pub fn strip_emphasis(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in EMPHASIS.captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1).or(caps.get(2)).or(caps.get(3)))
        else {
            continue;
        };
        let before = text[..whole.start()].chars().next_back();
        let after = text[whole.end()..].chars().next();
        if before.is_some_and(is_word_char) || after.is_some_and(is_word_char) {
            continue;
        }
        out.push_str(&text[last..whole.start()]);
        out.push_str(inner.as_str());
        last = whole.end();
    }

    out.push_str(&text[last..]);
    out
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Wrap content in a fenced code block
pub fn fence(language: &str, content: &str) -> String {
    format!("```{}\n{}\n```", language, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_with_marker() {
        assert_eq!(truncate_with_marker("hello world", 20, "..."), "hello world");
        assert_eq!(truncate_with_marker("hello world", 5, "... (truncated)"), "hello... (truncated)");
        assert_eq!(truncate_with_marker("hello", 5, "..."), "hello");
        assert_eq!(truncate_with_marker("héllo", 2, "~"), "hé~");
    }

    #[test]
    fn test_language_tag() {
        assert_eq!(language_tag("src/main.rs"), "rs");
        assert_eq!(language_tag("foo.js"), "js");
        assert_eq!(language_tag("archive.tar.gz"), "gz");
        assert_eq!(language_tag("Makefile"), "text");
        assert_eq!(language_tag(".gitignore"), "text");
        assert_eq!(language_tag("dir.d/README"), "text");
    }

    #[test]
    fn test_strip_emphasis() {
        assert_eq!(strip_emphasis("use **cargo** and __rustup__"), "use cargo and rustup");
        assert_eq!(strip_emphasis("an *em* word"), "an em word");
        assert_eq!(strip_emphasis("plain"), "plain");
        assert_eq!(strip_emphasis("**a** then *b*."), "a then b.");
    }

    #[test]
    fn test_strip_emphasis_keeps_identifiers() {
        assert_eq!(
            strip_emphasis("Call my_var and other_thing first."),
            "Call my_var and other_thing first."
        );
        assert_eq!(strip_emphasis("read __init__ or x__y__z"), "read init or x__y__z");
        assert_eq!(strip_emphasis("2*3*4 and a * b * c"), "2*3*4 and a * b * c");
    }

    #[test]
    fn test_fence() {
        assert_eq!(fence("js", "console.log(1)"), "```js\nconsole.log(1)\n```");
    }
}
