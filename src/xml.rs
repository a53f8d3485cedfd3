//! Escaping for untrusted text placed into the feed document.
//!
//! Titles and links go through [`escape`]. Article content may carry markup of
//! its own, so it is wrapped in CDATA by [`cdata`] instead.

/// Replace `&`, `<`, `>`, `"` and `'` with their named entities.
///
/// Absent values escape to the empty string. Already-escaped input is escaped
/// again: `&amp;` becomes `&amp;amp;`.
pub fn escape<'a>(value: impl Into<Option<&'a str>>) -> String {
    value
        .into()
        .map(|text| quick_xml::escape::escape(text).into_owned())
        .unwrap_or_default()
}

/// Wrap raw text in a CDATA section, or return an empty string for no content.
///
/// A literal `]]>` inside the text would end the section early, so it is split
/// across two sections.
pub fn cdata<'a>(value: impl Into<Option<&'a str>>) -> String {
    match value.into() {
        Some(text) if !text.is_empty() => {
            format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod escape_tests {
        use super::*;

        #[test]
        fn test_each_reserved_character() {
            assert_eq!(escape("&"), "&amp;");
            assert_eq!(escape("<"), "&lt;");
            assert_eq!(escape(">"), "&gt;");
            assert_eq!(escape("\""), "&quot;");
            assert_eq!(escape("'"), "&apos;");
        }

        #[test]
        fn test_mixed_markup() {
            assert_eq!(
                escape("<b>hi & bye</b>"),
                "&lt;b&gt;hi &amp; bye&lt;/b&gt;"
            );
        }

        #[test]
        fn test_plain_text_unchanged() {
            assert_eq!(escape("Plain title 123"), "Plain title 123");
        }

        #[test]
        fn test_non_ascii_preserved() {
            assert_eq!(escape("Artículo «nuevo» & más"), "Artículo «nuevo» &amp; más");
        }

        #[test]
        fn test_entities_are_escaped_again() {
            assert_eq!(escape("&amp;"), "&amp;amp;");
            assert_eq!(escape("&lt;"), "&amp;lt;");
        }

        #[test]
        fn test_absent_value_is_empty() {
            assert_eq!(escape(None::<&str>), "");
        }

        #[test]
        fn test_empty_string() {
            assert_eq!(escape(""), "");
        }

        #[test]
        fn test_url_with_query() {
            assert_eq!(
                escape("https://x.com/?a=1&b='2'"),
                "https://x.com/?a=1&amp;b=&apos;2&apos;"
            );
        }
    }

    mod cdata_tests {
        use super::*;

        #[test]
        fn test_markup_kept_verbatim() {
            assert_eq!(cdata("<b>hi & bye</b>"), "<![CDATA[<b>hi & bye</b>]]>");
        }

        #[test]
        fn test_empty_and_absent_content() {
            assert_eq!(cdata(""), "");
            assert_eq!(cdata(None::<&str>), "");
        }

        #[test]
        fn test_terminator_is_split() {
            assert_eq!(
                cdata("a]]>b"),
                "<![CDATA[a]]]]><![CDATA[>b]]>"
            );
        }
    }
}
