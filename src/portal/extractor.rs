//! HTML token extraction
//!
//! The portal pages are rendered HTML, not an API, so every value is scraped
//! from `<input>` tags. Matching is isolated behind [`TokenExtractor`] so the
//! session never depends on how the scraping is done.

use crate::core::errors::SessionError;
use crate::portal::types::{Nonce, SettingsTokens};
use regex::Regex;
use std::collections::HashMap;

/// Which attribute identifies an input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKey {
    Name,
    Id,
}

impl InputKey {
    const fn attribute(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Id => "id",
        }
    }
}

pub trait TokenExtractor: Send + Sync {
    /// `value` of the first input whose `key` attribute equals `ident`
    fn input_value(&self, html: &str, key: InputKey, ident: &str) -> Option<String>;

    /// Login form nonce: `<input name="nonce" value="...">`
    fn extract_nonce(&self, html: &str) -> Result<Nonce, SessionError> {
        self.input_value(html, InputKey::Name, "nonce")
            .map(Nonce::new)
            .ok_or_else(|| SessionError::extraction("nonce"))
    }

    /// All six settings tokens, identified by `id`, or an error naming the
    /// first missing one
    fn extract_settings_tokens(&self, html: &str) -> Result<SettingsTokens, SessionError> {
        let field = |ident: &str| {
            self.input_value(html, InputKey::Id, ident)
                .ok_or_else(|| SessionError::extraction(ident))
        };

        Ok(SettingsTokens {
            access_token: field("access_token")?,
            open_id: field("openId")?,
            user_id: field("userId")?,
            apiuser: field("apiuser")?,
            operate_id: field("operateId")?,
            language: field("language")?,
        })
    }
}

/// Regex-based extractor
///
/// Scans every `<input ...>` tag, reads its attributes regardless of order or
/// quote style, and returns the first tag that matches. Values are returned
/// verbatim; empty or whitespace-only values count as absent.
#[derive(Debug, Clone)]
pub struct RegexExtractor {
    input_tag: Regex,
    attribute: Regex,
}

impl RegexExtractor {
    pub fn new() -> Result<Self, SessionError> {
        Ok(Self {
            input_tag: Regex::new(r#"(?is)<input\b((?:[^>"']|"[^"]*"|'[^']*')*)>"#)?,
            attribute: Regex::new(
                r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>/]+))"#,
            )?,
        })
    }

    fn attributes<'h>(&self, tag_body: &'h str) -> HashMap<String, &'h str> {
        self.attribute
            .captures_iter(tag_body)
            .filter_map(|caps| {
                let name = caps.get(1)?.as_str().to_ascii_lowercase();
                let value = caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4))?;
                Some((name, value.as_str()))
            })
            .collect()
    }
}

impl TokenExtractor for RegexExtractor {
    fn input_value(&self, html: &str, key: InputKey, ident: &str) -> Option<String> {
        self.input_tag
            .captures_iter(html)
            .filter_map(|caps| caps.get(1))
            .map(|body| self.attributes(body.as_str()))
            .find(|attrs| attrs.get(key.attribute()).is_some_and(|v| *v == ident))
            .and_then(|attrs| attrs.get("value").map(|v| (*v).to_string()))
            .filter(|value| !value.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTINGS_PAGE: &str = r#"
        <form id="settings">
          <input type="hidden" id="access_token" value="AT1">
          <input type="hidden" id="openId" value="O1"/>
          <input type="hidden" value="111" id="userId">
          <input type='hidden' id='apiuser' value='U1'>
          <input
              type="hidden"
              id="operateId"
              value="OP1">
          <input type="hidden" id="language" value="en" />
        </form>
    "#;

    fn extractor() -> RegexExtractor {
        RegexExtractor::new().unwrap()
    }

    #[test]
    fn test_extract_nonce() {
        let html = r#"<form><input type="hidden" name="nonce" value="abc123">
            <input name="username"></form>"#;
        let nonce = extractor().extract_nonce(html).unwrap();
        assert_eq!(nonce.as_str(), "abc123");
    }

    #[test]
    fn test_nonce_attribute_order_does_not_matter() {
        let html = r#"<INPUT value="xyz" type="hidden" name="nonce">"#;
        assert_eq!(extractor().extract_nonce(html).unwrap().as_str(), "xyz");
    }

    #[test]
    fn test_first_nonce_wins() {
        let html = r#"<input name="nonce" value="one"><input name="nonce" value="two">"#;
        assert_eq!(extractor().extract_nonce(html).unwrap().as_str(), "one");
    }

    #[test]
    fn test_missing_nonce_is_extraction_failure() {
        let html = r#"<input name="not_nonce" value="abc"><input id="nonce" value="def">"#;
        match extractor().extract_nonce(html) {
            Err(SessionError::Extraction { field }) => assert_eq!(field, "nonce"),
            other => panic!("expected extraction failure, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_nonce_is_missing() {
        let html = r#"<input name="nonce" value="">"#;
        assert!(extractor().extract_nonce(html).is_err());
        let html = r#"<input name="nonce" value="   ">"#;
        assert!(extractor().extract_nonce(html).is_err());
    }

    #[test]
    fn test_gt_inside_quoted_value() {
        let html = r#"<input type="hidden" name="nonce" value="ab>cd">"#;
        assert_eq!(extractor().extract_nonce(html).unwrap().as_str(), "ab>cd");

        let html = r#"<input data-note='x > y' name="nonce" value="after">"#;
        assert_eq!(extractor().extract_nonce(html).unwrap().as_str(), "after");
    }

    #[test]
    fn test_value_is_not_trimmed() {
        let html = r#"<input type="hidden" name="nonce" value=" abc ">"#;
        assert_eq!(extractor().extract_nonce(html).unwrap().as_str(), " abc ");
    }

    #[test]
    fn test_extract_settings_tokens() {
        let tokens = extractor().extract_settings_tokens(SETTINGS_PAGE).unwrap();
        assert_eq!(
            tokens,
            SettingsTokens {
                access_token: "AT1".to_string(),
                apiuser: "U1".to_string(),
                language: "en".to_string(),
                open_id: "O1".to_string(),
                operate_id: "OP1".to_string(),
                user_id: "111".to_string(),
            }
        );
    }

    #[test]
    fn test_any_missing_token_fails_the_whole_set() {
        let extractor = extractor();
        for field in SettingsTokens::FIELDS {
            let html = SETTINGS_PAGE.replace(&format!("\"{}\"", field), "\"removed\"");
            let html = html.replace(&format!("'{}'", field), "'removed'");
            match extractor.extract_settings_tokens(&html) {
                Err(SessionError::Extraction { field: missing }) => assert_eq!(missing, field),
                other => panic!("expected failure for {}, got {:?}", field, other),
            }
        }
    }

    #[test]
    fn test_id_is_case_sensitive() {
        let html = SETTINGS_PAGE.replace("id=\"openId\"", "id=\"openid\"");
        assert!(extractor().extract_settings_tokens(&html).is_err());
    }
}
