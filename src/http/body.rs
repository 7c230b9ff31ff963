// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Response body decoding: gzip decompression and charset selection

use std::io::Read;

use encoding_rs::{Encoding, UTF_8};
use flate2::read::GzDecoder;
use lazy_static::lazy_static;
use regex::bytes::Regex;
use reqwest::header::{HeaderMap, CONTENT_ENCODING, CONTENT_TYPE};

use super::config::ClientConfig;
use crate::error::{Error, Result};

/// How far into an HTML body to look for a meta charset
const META_SNIFF_LIMIT: usize = 1024;

lazy_static! {
    static ref META_CHARSET: Regex =
        Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?\s*([A-Za-z0-9_:.\-]+)"#)
            .expect("meta charset pattern is valid");
}

/// Turn raw body bytes into the text handed to scripts
///
/// Headers are only read, never rewritten.
pub fn decode_body(headers: &HeaderMap, raw: &[u8], config: &ClientConfig) -> Result<String> {
    let decompressed;
    let bytes = if config.auto_uncompress && is_gzip(headers) && !raw.is_empty() {
        decompressed = gunzip(raw)?;
        &decompressed[..]
    } else {
        raw
    };

    let encoding = select_encoding(headers, bytes, config);
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::debug!(encoding = encoding.name(), "Body contained malformed sequences");
    }
    Ok(text.into_owned())
}

/// Only a gzip content-encoding is decompressed
pub fn is_gzip(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().eq_ignore_ascii_case("gzip") || v.trim().eq_ignore_ascii_case("x-gzip"))
        .unwrap_or(false)
}

fn gunzip(raw: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(raw);
    let mut out = Vec::with_capacity(raw.len() * 4);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::Decode(format!("gzip: {}", e)))?;
    Ok(out)
}

/// Pick the charset for a body
///
/// Forced preference, then meta charset when preferred for HTML, then the
/// content-type charset, then the preferred label, then meta charset, then UTF-8.
pub fn select_encoding(
    headers: &HeaderMap,
    body: &[u8],
    config: &ClientConfig,
) -> &'static Encoding {
    let preference = config.encoding_preference();

    if let Some(pref) = preference.as_ref().filter(|p| p.forced) {
        if let Some(encoding) = lookup(&pref.label) {
            return encoding;
        }
    }

    let html = is_html(headers);
    if html && config.html_prefer_meta_charset {
        if let Some(encoding) = meta_charset(body).as_deref().and_then(lookup) {
            return encoding;
        }
    }

    if let Some(encoding) = header_charset(headers).as_deref().and_then(lookup) {
        return encoding;
    }

    if let Some(pref) = preference.as_ref().filter(|p| !p.forced) {
        if let Some(encoding) = lookup(&pref.label) {
            return encoding;
        }
    }

    if html {
        if let Some(encoding) = meta_charset(body).as_deref().and_then(lookup) {
            return encoding;
        }
    }

    UTF_8
}

fn lookup(label: &str) -> Option<&'static Encoding> {
    let encoding = Encoding::for_label(label.trim().as_bytes());
    if encoding.is_none() {
        tracing::warn!(label, "Unknown charset label, ignoring");
    }
    encoding
}

/// `charset` parameter of the content-type header
pub fn header_charset(headers: &HeaderMap) -> Option<String> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (!value.is_empty()).then(|| value.to_string())
        } else {
            None
        }
    })
}

/// Charset from `<meta charset>` or `<meta http-equiv content="...charset=">`
pub fn meta_charset(body: &[u8]) -> Option<String> {
    let head = &body[..body.len().min(META_SNIFF_LIMIT)];
    META_CHARSET
        .captures(head)
        .and_then(|caps| caps.get(1))
        .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
}

fn is_html(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.contains("text/html") || ct.contains("application/xhtml"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use reqwest::header::HeaderValue;
    use std::io::Write;

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    fn gzip(text: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_gzip_decoded_headers_untouched() {
        let mut headers = headers("text/plain");
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        let raw = gzip("hello gzip");

        let body = decode_body(&headers, &raw, &ClientConfig::default()).unwrap();
        assert_eq!(body, "hello gzip");
        assert_eq!(headers.get(CONTENT_ENCODING).unwrap(), "gzip");
    }

    #[test]
    fn test_gzip_left_alone_when_disabled() {
        let mut headers = headers("application/octet-stream");
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        let raw = gzip("hello gzip");

        let config = ClientConfig::default().auto_uncompress(false);
        let body = decode_body(&headers, &raw, &config).unwrap();
        assert_ne!(body, "hello gzip");
    }

    #[test]
    fn test_corrupt_gzip_is_decode_error() {
        let mut headers = headers("text/plain");
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        let err = decode_body(&headers, b"not gzip", &ClientConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_header_charset_beats_preference() {
        let headers = headers("text/plain; charset=ISO-8859-1");
        let config = ClientConfig::default().encoding("shift_jis");
        assert_eq!(select_encoding(&headers, b"", &config).name(), "windows-1252");
    }

    #[test]
    fn test_forced_preference_beats_header() {
        let headers = headers("text/plain; charset=utf-8");
        let config = ClientConfig::default().encoding("gbk!");
        assert_eq!(select_encoding(&headers, b"", &config).name(), "GBK");

        let body = decode_body(&headers, &[0xC4, 0xE3, 0xBA, 0xC3], &config).unwrap();
        assert_eq!(body, "你好");
    }

    #[test]
    fn test_preference_used_without_declared_charset() {
        let headers = headers("text/plain");
        let config = ClientConfig::default().encoding("windows-1252");
        let body = decode_body(&headers, &[0x63, 0x61, 0x66, 0xE9], &config).unwrap();
        assert_eq!(body, "café");
    }

    #[test]
    fn test_meta_charset() {
        let html = br#"<html><head><meta charset="windows-1252"></head><body>caf\xe9</body></html>"#;
        assert_eq!(meta_charset(html).as_deref(), Some("windows-1252"));

        let http_equiv =
            br#"<meta http-equiv="Content-Type" content="text/html; charset=Shift_JIS">"#;
        assert_eq!(meta_charset(http_equiv).as_deref(), Some("Shift_JIS"));
    }

    #[test]
    fn test_meta_preference() {
        let headers = headers("text/html; charset=utf-8");
        let html = b"<meta charset=\"gbk\">";

        let config = ClientConfig::default();
        assert_eq!(select_encoding(&headers, html, &config), UTF_8);

        let config = config.html_prefer_meta_charset(true);
        assert_eq!(select_encoding(&headers, html, &config).name(), "GBK");
    }

    #[test]
    fn test_unknown_label_falls_back() {
        let headers = headers("text/plain; charset=x-made-up");
        assert_eq!(select_encoding(&headers, b"", &ClientConfig::default()), UTF_8);
    }
}
