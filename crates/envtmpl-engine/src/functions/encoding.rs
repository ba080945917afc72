//! Encoders and decoders: base32, base64, hex, JSON and URL query escaping

use base64::Engine as _;
use data_encoding::BASE32;
use minijinja::{Error, Value};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::error::{FunctionError, RegistryError};
use crate::registry::{FunctionDescriptor, Registry};

/// Everything but unreserved characters is escaped inside a query component
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const ENCODE_EXAMPLE: &str = r#"{{ "Hello WORLD!" | %s }}"#;

pub(super) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register(
        "base32Encode",
        FunctionDescriptor::plain("Encodes a value to base32.", Value::from_function(base32_encode))
            .with_example(ENCODE_EXAMPLE),
    )?;
    registry.register(
        "base32Decode",
        FunctionDescriptor::plain("Decodes a base32 string.", Value::from_function(base32_decode))
            .with_example(r#"{{ "JBSWY3DPEBLU6USMIQQQ====" | %s }}"#),
    )?;
    registry.register(
        "base64Encode",
        FunctionDescriptor::plain("Encodes a value to base64.", Value::from_function(base64_encode))
            .with_example(ENCODE_EXAMPLE),
    )?;
    registry.register(
        "base64Decode",
        FunctionDescriptor::plain("Decodes a base64 string.", Value::from_function(base64_decode))
            .with_example(r#"{{ "SGVsbG8gV09STEQh" | %s }}"#),
    )?;
    registry.register(
        "hexEncode",
        FunctionDescriptor::plain("Encodes a value to hex.", Value::from_function(hex_encode))
            .with_example(ENCODE_EXAMPLE),
    )?;
    registry.register(
        "hexDecode",
        FunctionDescriptor::plain("Decodes a hex string.", Value::from_function(hex_decode))
            .with_example(r#"{{ "48656c6c6f20574f524c4421" | %s }}"#),
    )?;
    registry.register(
        "jsonEncode",
        FunctionDescriptor::plain(
            "Encodes a value to indented JSON.",
            Value::from_function(json_encode),
        )
        .with_example(r#"{{ "Hello\n<WORLD>!" | %s }}"#)
        .with_example(r#"{{ split("Hello\n<WORLD>!", "\n") | %s }}"#),
    )?;
    registry.register(
        "jsonDecode",
        FunctionDescriptor::plain("Decodes a JSON string.", Value::from_function(json_decode))
            .with_example(r#"{% set j = "{\"foo\":\"bar\"}" | %s %}Foo is {{ j.foo }}"#),
    )?;
    registry.register(
        "urlEscape",
        FunctionDescriptor::plain(
            "Escapes the string so it can be safely placed inside a URL query.",
            Value::from_function(url_escape),
        )
        .with_example(r#"{{ "Hello World!" | %s }}"#),
    )?;
    registry.register(
        "urlUnescape",
        FunctionDescriptor::plain(
            "Unescapes a URL query string value.",
            Value::from_function(url_unescape),
        )
        .with_example(r#"{{ "Hello+World%21" | %s }}"#),
    )?;
    Ok(())
}

fn into_text(function: &'static str, bytes: Vec<u8>) -> Result<String, FunctionError> {
    String::from_utf8(bytes)
        .map_err(|e| FunctionError::decode(function, format!("decoded data is not valid UTF-8: {e}")))
}

/// Usage: {{ "Hello" | base32Encode }}
pub fn base32_encode(value: String) -> String {
    BASE32.encode(value.as_bytes())
}

/// Usage: {{ "JBSWY3DP" | base32Decode }}
pub fn base32_decode(value: String) -> Result<String, Error> {
    let bytes = BASE32
        .decode(value.as_bytes())
        .map_err(|e| FunctionError::decode("base32Decode", e))?;
    Ok(into_text("base32Decode", bytes)?)
}

/// Usage: {{ "Hello" | base64Encode }}
pub fn base64_encode(value: String) -> String {
    base64::engine::general_purpose::STANDARD.encode(value.as_bytes())
}

/// Usage: {{ "SGVsbG8=" | base64Decode }}
pub fn base64_decode(value: String) -> Result<String, Error> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(value.as_bytes())
        .map_err(|e| FunctionError::decode("base64Decode", e))?;
    Ok(into_text("base64Decode", bytes)?)
}

/// Usage: {{ "Hello" | hexEncode }}
pub fn hex_encode(value: String) -> String {
    hex::encode(value.as_bytes())
}

/// Usage: {{ "48656c6c6f" | hexDecode }}
pub fn hex_decode(value: String) -> Result<String, Error> {
    let bytes = hex::decode(value.as_bytes()).map_err(|e| FunctionError::decode("hexDecode", e))?;
    Ok(into_text("hexDecode", bytes)?)
}

/// Serialize any value to JSON indented with two spaces
///
/// Usage: {{ list | jsonEncode }}
pub fn json_encode(value: Value) -> Result<String, Error> {
    Ok(serde_json::to_string_pretty(&value).map_err(FunctionError::Encode)?)
}

/// Usage: {% set data = text | jsonDecode %}
pub fn json_decode(value: String) -> Result<Value, Error> {
    let parsed: serde_json::Value = serde_json::from_str(&value).map_err(|e| FunctionError::Parse {
        function: "jsonDecode",
        message: e.to_string(),
    })?;
    Ok(Value::from_serialize(parsed))
}

/// Query-component escaping; spaces become `+`
///
/// Usage: {{ "a b&c" | urlEscape }}
pub fn url_escape(value: String) -> String {
    // `%` itself is escaped, so a literal "%20" can only come from a space
    utf8_percent_encode(&value, QUERY_COMPONENT)
        .to_string()
        .replace("%20", "+")
}

/// Usage: {{ "a+b%26c" | urlUnescape }}
pub fn url_unescape(value: String) -> Result<String, Error> {
    Ok(unescape_query(&value)?)
}

pub(crate) fn unescape_query(value: &str) -> Result<String, FunctionError> {
    let bytes = value.as_bytes();
    for (i, _) in value.match_indices('%') {
        let valid = bytes.len() > i + 2
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit();
        if !valid {
            let end = (i + 3).min(bytes.len());
            return Err(FunctionError::decode(
                "urlUnescape",
                format!(
                    "invalid URL escape \"{}\"",
                    String::from_utf8_lossy(&bytes[i..end])
                ),
            ));
        }
    }

    let spaced = value.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| FunctionError::decode("urlUnescape", format!("invalid UTF-8 in escape: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_base32() {
        assert_eq!(base32_encode("Hello WORLD!".into()), "JBSWY3DPEBLU6USMIQQQ====");
        assert_eq!(base32_decode("JBSWY3DPEBLU6USMIQQQ====".into()).unwrap(), "Hello WORLD!");
        assert!(base32_decode("not base32!".into()).is_err());
    }

    #[test]
    fn test_base64() {
        assert_eq!(base64_encode("Hello WORLD!".into()), "SGVsbG8gV09STEQh");
        assert_eq!(base64_decode("SGVsbG8gV09STEQh".into()).unwrap(), "Hello WORLD!");
        assert!(base64_decode("SGVsbG8@".into()).is_err());
        assert!(base64_decode("SGVsbG8".into()).is_err());
    }

    #[test]
    fn test_hex() {
        assert_eq!(hex_encode("Hello WORLD!".into()), "48656c6c6f20574f524c4421");
        assert_eq!(hex_decode("48656c6c6f20574f524c4421".into()).unwrap(), "Hello WORLD!");
        assert!(hex_decode("4865zz".into()).is_err());
        assert!(hex_decode("486".into()).is_err());
    }

    #[test]
    fn test_round_trips() {
        for s in ["", "a", "ab", "abc", "Hello\n<WORLD>!", "ᛁᚳ᛫ᛗᚨᚷ", "\u{0}\u{7f}"] {
            assert_eq!(base32_decode(base32_encode(s.into())).unwrap(), s);
            assert_eq!(base64_decode(base64_encode(s.into())).unwrap(), s);
            assert_eq!(hex_decode(hex_encode(s.into())).unwrap(), s);
        }
    }

    proptest! {
        #[test]
        fn prop_encodings_round_trip(s in any::<String>()) {
            prop_assert_eq!(base32_decode(base32_encode(s.clone())).unwrap(), s.clone());
            prop_assert_eq!(base64_decode(base64_encode(s.clone())).unwrap(), s.clone());
            prop_assert_eq!(hex_decode(hex_encode(s.clone())).unwrap(), s);
        }

        #[test]
        fn prop_url_escape_round_trips(s in any::<String>()) {
            prop_assert_eq!(url_unescape(url_escape(s.clone())).unwrap(), s);
        }
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let err = hex_decode("ff".into()).unwrap_err();
        assert!(err.to_string().contains("not valid UTF-8"));
    }

    #[test]
    fn test_json_encode_is_indented() {
        let value = Value::from(vec!["Hello", "<WORLD>!"]);
        assert_eq!(
            json_encode(value).unwrap(),
            "[\n  \"Hello\",\n  \"<WORLD>!\"\n]"
        );
        assert_eq!(json_encode(Value::from("a\nb")).unwrap(), "\"a\\nb\"");
    }

    #[test]
    fn test_json_decode() {
        let value = json_decode(r#"{"foo":"bar","n":[1,2]}"#.into()).unwrap();
        assert_eq!(value.get_attr("foo").unwrap().as_str(), Some("bar"));
        assert_eq!(value.get_attr("n").unwrap().len(), Some(2));

        let err = json_decode("{not json".into()).unwrap_err();
        assert!(err.to_string().contains("jsonDecode"));
    }

    #[test]
    fn test_url_escape() {
        assert_eq!(url_escape("Hello World!".into()), "Hello+World%21");
        assert_eq!(url_escape("a-b_c.d~e".into()), "a-b_c.d~e");
        assert_eq!(url_escape("100%".into()), "100%25");
        assert_eq!(url_escape("é".into()), "%C3%A9");
    }

    #[test]
    fn test_url_unescape() {
        assert_eq!(unescape_query("Hello+World%21").unwrap(), "Hello World!");
        assert_eq!(unescape_query("a%2Bb").unwrap(), "a+b");
        assert_eq!(unescape_query("%C3%A9").unwrap(), "é");
        assert!(matches!(
            unescape_query("bad%zzescape"),
            Err(FunctionError::Decode { function: "urlUnescape", .. })
        ));
        assert!(unescape_query("trailing%2").is_err());
    }

    #[test]
    fn test_url_escape_round_trip() {
        for s in ["Hello World!", "a+b=c&d", "100% ünïcödé", ""] {
            assert_eq!(unescape_query(&url_escape(s.into())).unwrap(), s);
        }
    }
}
