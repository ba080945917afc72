//! URL-friendly slugs with a selectable Unicode normalization

use minijinja::value::Rest;
use minijinja::{Error, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::error::{FunctionError, RegistryError};
use crate::registry::{FunctionDescriptor, Registry};

/// Anything that is not a letter, a number, white space or `-_~`
static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\s_~-]+").expect("static pattern"));

/// White space and dashes collapse into a single `-`
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s-]+").expect("static pattern"));

/// Unicode normalization applied before filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalizationForm {
    #[default]
    Nfc,
    Nfd,
    Nfkc,
    Nfkd,
}

impl NormalizationForm {
    /// Parse a form name, with or without its `N` prefix; empty means NFC
    pub fn parse(mode: &str) -> Result<Self, FunctionError> {
        match mode.to_uppercase().as_str() {
            "" | "NFC" | "C" => Ok(Self::Nfc),
            "NFD" | "FD" => Ok(Self::Nfd),
            "NFKC" | "KC" => Ok(Self::Nfkc),
            "NFKD" | "KD" => Ok(Self::Nfkd),
            _ => Err(FunctionError::UnknownMode(mode.to_string())),
        }
    }

    pub fn normalize(&self, value: &str) -> String {
        match self {
            Self::Nfc => value.nfc().collect(),
            Self::Nfd => value.nfd().collect(),
            Self::Nfkc => value.nfkc().collect(),
            Self::Nfkd => value.nfkd().collect(),
        }
    }
}

pub(super) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register(
        "slugify",
        FunctionDescriptor::plain(
            "Converts a string into a lowercase slug. An optional first argument selects the Unicode normalization: NFC (default), NFD, NFKC or NFKD; the leading N may be left out.",
            Value::from_function(slugify),
        )
        .with_example(r#"{{ "Hello WORLD!" | %s }}"#)
        .with_example(r#"{{ "Hello W/O-R_L~D!" | %s }}"#)
        .with_example(
            "{% for mode in [\"NFC\", \"NFD\", \"NFKC\", \"NFKD\"] %}{{ mode }}: {{ \"Hello áçćèńtš!\" | %s(mode) }}\n{% endfor %}",
        ),
    )
}

/// Usage: {{ title | slugify }} or {{ title | slugify("NFD") }}
pub fn slugify(args: Rest<String>) -> Result<String, Error> {
    let got = args.len();
    let (form, value) = match args.0.as_slice() {
        [value] => (NormalizationForm::default(), value),
        [mode, value] => (NormalizationForm::parse(mode)?, value),
        _ => return Err(FunctionError::arity("slugify", "1 or 2", got).into()),
    };
    Ok(make_slug(form, value))
}

/// Lowercasing runs before filtering, since it can produce combining marks
/// (`İ` lowercases to `i` followed by U+0307)
pub(crate) fn make_slug(form: NormalizationForm, value: &str) -> String {
    let lowered = form.normalize(value).to_lowercase();
    let kept = DISALLOWED.replace_all(&lowered, "");
    SEPARATORS.replace_all(&kept, "-").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_form() -> impl Strategy<Value = NormalizationForm> {
        prop_oneof![
            Just(NormalizationForm::Nfc),
            Just(NormalizationForm::Nfd),
            Just(NormalizationForm::Nfkc),
            Just(NormalizationForm::Nfkd),
        ]
    }

    proptest! {
        #[test]
        fn prop_slug_alphabet(form in any_form(), s in any::<String>()) {
            let slug = make_slug(form, &s);
            let allowed = Regex::new(r"^[\p{L}\p{N}_~-]*$").unwrap();

            prop_assert!(allowed.is_match(&slug), "{:?} -> {:?}", s, slug);
            prop_assert!(!slug.contains("--"), "{:?} -> {:?}", s, slug);
            prop_assert_eq!(slug.to_lowercase(), slug);
        }
    }

    #[test]
    fn test_default_slug() {
        assert_eq!(make_slug(NormalizationForm::Nfc, "Hello WORLD!"), "hello-world");
        assert_eq!(make_slug(NormalizationForm::Nfc, "Hello W/O-R_L~D!"), "hello-wo-r_l~d");
        assert_eq!(make_slug(NormalizationForm::Nfc, "a  --  b"), "a-b");
    }

    #[test]
    fn test_decomposition_drops_marks() {
        assert_eq!(make_slug(NormalizationForm::Nfd, "Hello áçćèńtš!"), "hello-accents");
        assert_eq!(make_slug(NormalizationForm::Nfkd, "Hello áçćèńtš!"), "hello-accents");
        assert_eq!(make_slug(NormalizationForm::Nfc, "Hello áçćèńtš!"), "hello-áçćèńtš");
    }

    #[test]
    fn test_compatibility_forms() {
        assert_eq!(make_slug(NormalizationForm::Nfkc, "ﬁne ①"), "fine-1");
        assert_eq!(make_slug(NormalizationForm::Nfc, "ﬁne"), "ﬁne");
    }

    #[test]
    fn test_marks_are_not_letters() {
        assert_eq!(make_slug(NormalizationForm::Nfc, "İstanbul"), "istanbul");
        assert_eq!(make_slug(NormalizationForm::Nfd, "ᾳ"), "α");
        assert_eq!(make_slug(NormalizationForm::Nfc, "काम"), "कम");
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(NormalizationForm::parse("").unwrap(), NormalizationForm::Nfc);
        assert_eq!(NormalizationForm::parse("nfkd").unwrap(), NormalizationForm::Nfkd);
        assert_eq!(NormalizationForm::parse("C").unwrap(), NormalizationForm::Nfc);
        assert_eq!(NormalizationForm::parse("fd").unwrap(), NormalizationForm::Nfd);
        assert_eq!(NormalizationForm::parse("KC").unwrap(), NormalizationForm::Nfkc);
        assert_eq!(NormalizationForm::parse("kd").unwrap(), NormalizationForm::Nfkd);
        assert!(matches!(
            NormalizationForm::parse("NFX"),
            Err(FunctionError::UnknownMode(mode)) if mode == "NFX"
        ));
    }

    #[test]
    fn test_arity() {
        assert!(slugify(Rest(vec![])).is_err());
        assert!(slugify(Rest(vec!["a".into(), "b".into(), "c".into()])).is_err());
        assert_eq!(
            slugify(Rest(vec!["NFD".into(), "Été".into()])).unwrap(),
            "ete"
        );
    }
}
