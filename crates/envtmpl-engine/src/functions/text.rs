//! String transforms: case, trimming, splitting, slicing, wrapping

use minijinja::{Error, Value};
use regex::Regex;

use crate::error::{FunctionError, RegistryError};
use crate::registry::{FunctionDescriptor, Registry};

const CASE_EXAMPLE: &str = r#"{{ "foo BAR bAz" | %s }}"#;

pub(super) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register(
        "lower",
        FunctionDescriptor::plain("Convert to lower case.", Value::from_function(lower))
            .with_example(CASE_EXAMPLE),
    )?;
    registry.register(
        "upper",
        FunctionDescriptor::plain("Convert to upper case.", Value::from_function(upper))
            .with_example(CASE_EXAMPLE),
    )?;
    registry.register(
        "title",
        FunctionDescriptor::plain("Convert to title case.", Value::from_function(title))
            .with_example(CASE_EXAMPLE),
    )?;
    registry.register(
        "trimPrefix",
        FunctionDescriptor::plain(
            "Remove leading prefix. If the string doesn't start with the prefix then it's unchanged.",
            Value::from_function(trim_prefix),
        )
        .with_example(r#"{{ "foo.bar" | %s("foo.") }}"#)
        .with_example(r#"{{ "foo.bar" | %s("baz.") }}"#),
    )?;
    registry.register(
        "trimSuffix",
        FunctionDescriptor::plain(
            "Remove trailing suffix. If the string doesn't end with the suffix then it's unchanged.",
            Value::from_function(trim_suffix),
        )
        .with_example(r#"{{ "foo.bar" | %s(".bar") }}"#)
        .with_example(r#"{{ "foo.bar" | %s(".baz") }}"#),
    )?;
    registry.register(
        "trimSpace",
        FunctionDescriptor::plain(
            "Remove all leading and trailing white space.",
            Value::from_function(trim_space),
        )
        .with_example(r#"[{{ " \t\n foo bar \t\n " | %s }}]"#),
    )?;
    registry.register(
        "split",
        FunctionDescriptor::plain(
            "Split a string into substrings separated by another string.",
            Value::from_function(split),
        )
        .with_example(
            r#"{% for v in "foo BAR bAz" | %s(" ") %}{{ loop.index0 }}={{ v }} {% endfor %}"#,
        ),
    )?;
    registry.register(
        "linePrefix",
        FunctionDescriptor::plain("Prefix each line.", Value::from_function(line_prefix))
            .with_example(r#"{{ "line1\nline2\nline3" | %s("- ") }}"#),
    )?;
    registry.register(
        "slice",
        FunctionDescriptor::plain(
            "Construct a substring from a string, counting in characters rather than bytes.",
            Value::from_function(slice),
        )
        .with_example(r#"{{ "ᛁᚳ᛫ᛗᚨᚷ᛫ᚷᛚᚨᛋ᛫" | %s(3, 7) }}"#),
    )?;
    registry.register(
        "wordWrap",
        FunctionDescriptor::plain(
            "Wraps text to a given number of characters. Any existing white space is lost in the transformation.",
            Value::from_function(word_wrap),
        )
        .with_example(r#"{{ "The quick brown fox jumps over the lazy dog." | %s(19) }}"#)
        .with_example(r#"{{ "\t  The quick\nbrown fox jumps over the\n\t\tlazy dog." | %s(19) }}"#)
        .with_example(r#"{{ "Γαζέες καὶ μυρτιὲς δὲν θὰ βρῶ πιὰ στὸ χρυσαφὶ ξέφωτο" | %s(19) }}"#),
    )?;
    registry.register(
        "regexReplace",
        FunctionDescriptor::plain(
            "Replace values using a regular expression. Groups are referenced as $1 or ${name}.",
            Value::from_function(regex_replace),
        )
        .with_example(r#"{{ "this is something" | %s("(this) is ", "[$1] was ") }}"#),
    )?;
    Ok(())
}

/// Usage: {{ "Hello" | lower }}
pub fn lower(value: String) -> String {
    value.to_lowercase()
}

/// Usage: {{ "Hello" | upper }}
pub fn upper(value: String) -> String {
    value.to_uppercase()
}

/// Upper-case the first letter of every word
///
/// Usage: {{ "foo BAR bAz" | title }}
pub fn title(value: String) -> String {
    let mut result = String::with_capacity(value.len());
    let mut prev = ' ';

    for c in value.chars() {
        if is_word_separator(prev) {
            result.extend(c.to_uppercase());
        } else {
            result.push(c);
        }
        prev = c;
    }

    result
}

fn is_word_separator(c: char) -> bool {
    if c.is_ascii() {
        !(c.is_ascii_alphanumeric() || c == '_')
    } else if c.is_alphanumeric() {
        false
    } else {
        c.is_whitespace()
    }
}

/// Usage: {{ "foo.bar" | trimPrefix("foo.") }}
pub fn trim_prefix(prefix: String, value: String) -> String {
    match value.strip_prefix(prefix.as_str()) {
        Some(rest) => rest.to_string(),
        None => value,
    }
}

/// Usage: {{ "foo.bar" | trimSuffix(".bar") }}
pub fn trim_suffix(suffix: String, value: String) -> String {
    match value.strip_suffix(suffix.as_str()) {
        Some(rest) => rest.to_string(),
        None => value,
    }
}

/// Usage: {{ "  foo  " | trimSpace }}
pub fn trim_space(value: String) -> String {
    value.trim().to_string()
}

/// Split on a literal separator, keeping empty fields
///
/// An empty separator splits after each character.
///
/// Usage: {{ "a,b,,c" | split(",") }}
pub fn split(separator: String, value: String) -> Vec<String> {
    if separator.is_empty() {
        return value.chars().map(String::from).collect();
    }
    value.split(separator.as_str()).map(str::to_string).collect()
}

/// Prefix every line, including the empty one after a trailing newline
///
/// Usage: {{ text | linePrefix("    ") }}
pub fn line_prefix(prefix: String, data: String) -> String {
    let mut result = String::with_capacity(data.len() + prefix.len() * (data.lines().count() + 1));

    for line in data.split_inclusive('\n') {
        result.push_str(&prefix);
        result.push_str(line);
    }
    if data.is_empty() || data.ends_with('\n') {
        result.push_str(&prefix);
    }

    result
}

/// Substring over character positions `[low, high)`
///
/// Usage: {{ "ᛁᚳ᛫ᛗᚨᚷ" | slice(1, 3) }}
pub fn slice(low: usize, high: usize, value: String) -> Result<String, Error> {
    Ok(slice_chars(low, high, &value)?)
}

pub(crate) fn slice_chars(low: usize, high: usize, value: &str) -> Result<String, FunctionError> {
    let len = value.chars().count();
    if low > high || high > len {
        return Err(FunctionError::invalid(
            "slice",
            format!("bounds [{low}:{high}] out of range for string of {len} characters"),
        ));
    }
    Ok(value.chars().skip(low).take(high - low).collect())
}

/// Usage: {{ text | wordWrap(72) }}
pub fn word_wrap(width: usize, value: String) -> String {
    wrap_words(width, &value)
}

/// Greedy word wrap on character counts
///
/// Words are packed while `line + 1 + word <= width`; a word longer than
/// `width` sits alone on its own line.
pub(crate) fn wrap_words(width: usize, text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut line_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if result.is_empty() {
            line_len = word_len;
        } else if line_len + 1 + word_len <= width {
            result.push(' ');
            line_len += 1 + word_len;
        } else {
            result.push('\n');
            line_len = word_len;
        }
        result.push_str(word);
    }

    result
}

/// Usage: {{ "this is x" | regexReplace("(this) is", "$1 was") }}
pub fn regex_replace(pattern: String, replacement: String, value: String) -> Result<String, Error> {
    Ok(replace_all(&pattern, &replacement, &value)?)
}

pub(crate) fn replace_all(pattern: &str, replacement: &str, value: &str) -> Result<String, FunctionError> {
    let re = Regex::new(pattern)?;
    Ok(re.replace_all(value, replacement).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_case_conversion() {
        assert_eq!(lower("Hello WORLD!".to_string()), "hello world!");
        assert_eq!(upper("Hello World!".to_string()), "HELLO WORLD!");
        assert_eq!(upper("straße".to_string()), "STRASSE");
    }

    #[test]
    fn test_upper_is_idempotent() {
        for s in ["Hello World!", "straße", "Γαζέες καὶ", "ǆemal", "ﬁne"] {
            let once = upper(s.to_string());
            assert_eq!(upper(once.clone()), once);
        }
    }

    proptest! {
        #[test]
        fn prop_upper_is_idempotent(s in any::<String>()) {
            let once = upper(s);
            prop_assert_eq!(upper(once.clone()), once);
        }

        #[test]
        fn prop_split_keeps_every_field(
            fields in prop::collection::vec("[a-z ]{0,5}", 1..6),
        ) {
            let joined = fields.join(",");
            prop_assert_eq!(split(",".into(), joined), fields);
        }
    }

    #[test]
    fn test_title() {
        assert_eq!(title("foo BAR bAz".to_string()), "Foo BAR BAz");
        assert_eq!(title("hello-world_foo".to_string()), "Hello-World_foo");
        assert_eq!(title("élan vital".to_string()), "Élan Vital");
    }

    #[test]
    fn test_trim() {
        assert_eq!(trim_prefix("foo.".into(), "foo.bar".into()), "bar");
        assert_eq!(trim_prefix("baz.".into(), "foo.bar".into()), "foo.bar");
        assert_eq!(trim_suffix(".bar".into(), "foo.bar".into()), "foo");
        assert_eq!(trim_suffix(".baz".into(), "foo.bar".into()), "foo.bar");
        assert_eq!(trim_space(" \t\n foo bar \t\n ".into()), "foo bar");
    }

    #[test]
    fn test_split_preserves_empty_fields() {
        assert_eq!(split(",".into(), "a,b,,c,".into()), vec!["a", "b", "", "c", ""]);
        assert_eq!(split(" ".into(), "foo BAR bAz".into()), vec!["foo", "BAR", "bAz"]);
        assert_eq!(split(String::new(), "añb".into()), vec!["a", "ñ", "b"]);
        assert_eq!(split(",".into(), String::new()), vec![""]);
    }

    #[test]
    fn test_line_prefix() {
        assert_eq!(
            line_prefix("- ".into(), "line1\nline2\nline3".into()),
            "- line1\n- line2\n- line3"
        );
        assert_eq!(line_prefix("- ".into(), "a\n".into()), "- a\n- ");
        assert_eq!(line_prefix("> ".into(), String::new()), "> ");
    }

    #[test]
    fn test_slice_counts_characters() {
        assert_eq!(slice_chars(3, 7, "ᛁᚳ᛫ᛗᚨᚷ᛫ᚷᛚᚨᛋ᛫").unwrap(), "ᛗᚨᚷ᛫");
        assert_eq!(slice_chars(1, 3, "héllo").unwrap(), "él");
        assert_eq!(slice_chars(2, 2, "abc").unwrap(), "");
    }

    #[test]
    fn test_slice_out_of_range() {
        assert!(matches!(
            slice_chars(2, 10, "abc"),
            Err(FunctionError::InvalidArgument { function: "slice", .. })
        ));
        assert!(slice_chars(2, 1, "abc").is_err());
    }

    #[test]
    fn test_word_wrap() {
        let wrapped = wrap_words(19, "The quick brown fox jumps over the lazy dog.");
        assert_eq!(wrapped, "The quick brown fox\njumps over the lazy\ndog.");
        for line in wrapped.lines() {
            assert!(line.chars().count() <= 19);
        }
    }

    #[test]
    fn test_word_wrap_discards_whitespace() {
        assert_eq!(
            wrap_words(19, "\t  The quick\nbrown fox jumps over the\n\t\tlazy dog."),
            "The quick brown fox\njumps over the lazy\ndog."
        );
    }

    #[test]
    fn test_word_wrap_long_word_alone() {
        assert_eq!(
            wrap_words(5, "a supercalifragilistic b c"),
            "a\nsupercalifragilistic\nb c"
        );
        assert_eq!(wrap_words(3, "abcdef"), "abcdef");
        assert_eq!(wrap_words(10, ""), "");
    }

    #[test]
    fn test_word_wrap_counts_characters() {
        let wrapped = wrap_words(19, "Γαζέες καὶ μυρτιὲς δὲν θὰ βρῶ πιὰ στὸ χρυσαφὶ ξέφωτο");
        for line in wrapped.lines() {
            assert!(line.chars().count() <= 19, "line too wide: {line}");
        }
        assert!(wrapped.lines().count() > 1);
    }

    #[test]
    fn test_regex_replace() {
        assert_eq!(
            replace_all("(this) is ", "[$1] was ", "this is something").unwrap(),
            "[this] was something"
        );
        assert_eq!(replace_all("a+", "-", "caaabaa").unwrap(), "c-b-");
        assert!(matches!(
            replace_all("(unclosed", "x", "y"),
            Err(FunctionError::InvalidPattern(_))
        ));
    }
}
