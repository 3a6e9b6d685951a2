//! Turning page bodies and channel payloads into [`Candidate`]s.

use crate::action::{FetchedPage, PageParams};
use crate::error::DecodeError;
use crate::types::{Candidate, IdentityKey, Rank};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

pub const FROM_ATTR: &str = "data-from-address-hash";
pub const TO_ATTR: &str = "data-to-address-hash";

/// Value of attribute `name` on the first element of `fragment` carrying it.
pub fn attr<'a>(fragment: &'a str, name: &str) -> Option<&'a str> {
    let bytes = fragment.as_bytes();
    let mut from = 0;
    while let Some(found) = fragment[from..].find(name) {
        let start = from + found;
        let end = start + name.len();
        from = end;

        let bounded = start > 0 && matches!(bytes[start - 1], b' ' | b'\t' | b'\n' | b'\r');
        if !bounded {
            continue;
        }
        let rest = fragment[end..].trim_start();
        let Some(rest) = rest.strip_prefix('=') else {
            continue;
        };
        let rest = rest.trim_start();
        let quote = match rest.chars().next() {
            Some(q @ ('"' | '\'')) => q,
            _ => {
                let value_end = rest
                    .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
                    .unwrap_or(rest.len());
                return Some(&rest[..value_end]);
            }
        };
        let body = &rest[1..];
        return body.find(quote).map(|close| &body[..close]);
    }
    None
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemDecoder {
    /// Channel payload field holding the fragment.
    pub html_field: &'static str,
    /// Fragment attribute carrying the identity key.
    pub key_attr: &'static str,
    /// Payload field carrying the identity, used before `key_attr`.
    pub key_field: Option<&'static str>,
    /// Fragment attribute carrying the rank (ranked feeds).
    pub rank_attr: Option<&'static str>,
    pub rank_field: Option<&'static str>,
}

impl ItemDecoder {
    /// Decode one server-rendered page item.
    pub fn decode_fragment(&self, html: &str) -> Result<Candidate, DecodeError> {
        let key = attr(html, self.key_attr)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| DecodeError::MissingIdentity(self.key_attr.to_string()))?;
        let mut candidate = Candidate::new(IdentityKey::new(key), html);
        if let Some(rank_attr) = self.rank_attr {
            let raw = attr(html, rank_attr).ok_or_else(|| DecodeError::MissingRank {
                attr: rank_attr.to_string(),
            })?;
            candidate = candidate.with_rank(parse_rank(raw)?);
        }
        Ok(candidate.with_roles(attr(html, FROM_ATTR), attr(html, TO_ATTR)))
    }

    /// Decode one live channel payload.
    pub fn decode_message(&self, payload: &Value) -> Result<Candidate, DecodeError> {
        let html = payload
            .get(self.html_field)
            .and_then(Value::as_str)
            .ok_or_else(|| DecodeError::MissingField(self.html_field.to_string()))?;

        let key = match self.key_field.and_then(|f| field_string(payload, f)) {
            Some(key) => key,
            None => attr(html, self.key_attr)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .ok_or_else(|| DecodeError::MissingIdentity(self.key_attr.to_string()))?,
        };
        let mut candidate = Candidate::new(IdentityKey::new(key), html);

        if let Some(rank_attr) = self.rank_attr {
            let raw = match self.rank_field.and_then(|f| field_string(payload, f)) {
                Some(raw) => raw,
                None => attr(html, rank_attr)
                    .map(str::to_string)
                    .ok_or_else(|| DecodeError::MissingRank {
                        attr: rank_attr.to_string(),
                    })?,
            };
            candidate = candidate.with_rank(parse_rank(&raw)?);
        }

        let from = field_string(payload, "from_address_hash");
        let to = field_string(payload, "to_address_hash");
        Ok(candidate.with_roles(
            from.as_deref().or_else(|| attr(html, FROM_ATTR)),
            to.as_deref().or_else(|| attr(html, TO_ATTR)),
        ))
    }

    /// Decode a `type=JSON` listing response.
    pub fn decode_page(&self, body: &str) -> Result<FetchedPage, DecodeError> {
        let raw: PageBody =
            serde_json::from_str(body).map_err(|e| DecodeError::Json(e.to_string()))?;
        let items = raw
            .items
            .iter()
            .map(|html| self.decode_fragment(html))
            .collect::<Result<Vec<_>, _>>()?;
        let next_page_params = match raw.next_page_params {
            Some(Value::Object(map)) => Some(page_params(map)?),
            _ => None,
        };
        Ok(FetchedPage {
            items,
            next_page_path: raw.next_page_path.filter(|p| !p.is_empty()),
            next_page_params,
        })
    }
}

#[derive(Deserialize)]
struct PageBody {
    #[serde(default)]
    items: Vec<String>,
    #[serde(default)]
    next_page_path: Option<String>,
    #[serde(default)]
    next_page_params: Option<Value>,
}

fn page_params(map: serde_json::Map<String, Value>) -> Result<PageParams, DecodeError> {
    let mut rest = BTreeMap::new();
    let mut page_number = None;
    let mut pages_limit = None;
    for (key, value) in map {
        let Some(text) = value_string(&value) else {
            continue;
        };
        match key.as_str() {
            "page_number" => page_number = Some(parse_u32(&key, &text)?),
            "pages_limit" => pages_limit = Some(parse_u32(&key, &text)?),
            _ => {
                rest.insert(key, text);
            }
        }
    }
    Ok(PageParams {
        page_number: page_number.ok_or_else(|| DecodeError::MissingField("page_number".into()))?,
        pages_limit: pages_limit.unwrap_or(1),
        rest,
    })
}

fn parse_u32(field: &str, text: &str) -> Result<u32, DecodeError> {
    text.trim()
        .parse()
        .map_err(|_| DecodeError::Json(format!("`{field}` is not a page number: {text}")))
}

fn parse_rank(raw: &str) -> Result<Rank, DecodeError> {
    raw.trim().parse().map_err(|_| DecodeError::InvalidRank {
        value: raw.to_string(),
    })
}

fn value_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn field_string(payload: &Value, field: &str) -> Option<String> {
    payload.get(field).and_then(value_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn blocks() -> ItemDecoder {
        ItemDecoder {
            html_field: "block_html",
            key_attr: "data-block-number",
            key_field: None,
            rank_attr: Some("data-block-number"),
            rank_field: Some("block_number"),
        }
    }

    fn transactions() -> ItemDecoder {
        ItemDecoder {
            html_field: "transaction_html",
            key_attr: "data-identifier-hash",
            key_field: Some("transaction_hash"),
            rank_attr: None,
            rank_field: None,
        }
    }

    #[test]
    fn attr_reads_quoted_and_bare_values() {
        let html = r#"<div class="tile" data-block-number="42" data-x='y' data-z=7>"#;
        assert_eq!(attr(html, "data-block-number"), Some("42"));
        assert_eq!(attr(html, "data-x"), Some("y"));
        assert_eq!(attr(html, "data-z"), Some("7"));
        assert_eq!(attr(html, "data-missing"), None);
    }

    #[test]
    fn attr_does_not_match_inside_longer_names() {
        let html = r#"<div data-block-number-old="1" data-block-number="2">"#;
        assert_eq!(attr(html, "data-block-number"), Some("2"));
        assert_eq!(attr(r#"<div xdata-key="1">"#, "data-key"), None);
    }

    #[test]
    fn ranked_fragment_is_keyed_by_rank() {
        let c = blocks()
            .decode_fragment(r#"<div data-block-number="17"></div>"#)
            .expect("decodes");
        assert_eq!(c.rank, Some(17));
        assert_eq!(c.key, IdentityKey::for_rank(17));
    }

    #[test]
    fn fragment_without_identity_is_rejected() {
        let err = transactions().decode_fragment("<div></div>").unwrap_err();
        assert_eq!(err, DecodeError::MissingIdentity("data-identifier-hash".into()));
    }

    #[test]
    fn message_uses_payload_fields_and_roles() {
        let payload = json!({
            "transaction_html": "<div data-identifier-hash=\"0xabc\"></div>",
            "transaction_hash": "0xabc",
            "from_address_hash": "0x01",
            "to_address_hash": "0x02",
        });
        let c = transactions().decode_message(&payload).expect("decodes");
        assert_eq!(c.key.as_str(), "0xabc");
        assert_eq!(c.from_address_hash.as_deref(), Some("0x01"));
        assert_eq!(c.to_address_hash.as_deref(), Some("0x02"));
        assert_eq!(c.rank, None);
    }

    #[test]
    fn block_message_takes_numeric_rank_field() {
        let payload = json!({"block_html": "<div></div>", "block_number": 99});
        let c = blocks().decode_message(&payload).expect("decodes");
        assert_eq!(c.rank, Some(99));
    }

    #[test]
    fn page_with_cursor_and_params() {
        let body = r#"{
            "items": ["<div data-block-number=\"9\"></div>", "<div data-block-number=\"8\"></div>"],
            "next_page_path": "/blocks?block_number=7",
            "next_page_params": {"page_number": "2", "pages_limit": 40, "block_number": 7}
        }"#;
        let page = blocks().decode_page(body).expect("decodes");
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.next_page_path.as_deref(), Some("/blocks?block_number=7"));
        let params = page.next_page_params.expect("params");
        assert_eq!(params.page_number, 2);
        assert_eq!(params.pages_limit, 40);
        assert_eq!(params.rest.get("block_number").map(String::as_str), Some("7"));
    }

    #[test]
    fn broken_page_bodies_are_errors() {
        assert!(matches!(blocks().decode_page("nope"), Err(DecodeError::Json(_))));
        let body = r#"{"items": ["<div data-block-number=\"x\"></div>"]}"#;
        assert!(matches!(
            blocks().decode_page(body),
            Err(DecodeError::InvalidRank { .. })
        ));
    }
}
