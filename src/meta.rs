//! Request metadata parsing.
//!
//! An inbound upload carries two layers of information: transport headers
//! (Content-Type, Content-Range, Content-Disposition) and user-defined
//! property headers (`name`, `hash`, `creator`, `sysId`).  [`parse_meta`]
//! folds both into a [`RequestMeta`] descriptor.  This stage never touches
//! the request body or the backing store.

use axum::http::HeaderMap;
use mime::Mime;
use tracing::warn;

use crate::errors::GatewayError;

/// Parsed description of an upload request.
///
/// Constructed at request entry, discarded once the pipeline step
/// completes; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestMeta {
    /// Effective media type.  Everything that is not multipart/form-data is
    /// treated as a generic binary upload.
    pub media_type: String,
    /// Multipart boundary, present only for multipart/form-data.
    pub boundary: Option<String>,
    /// Parsed Content-Range triple.  Advisory only: uploads are always
    /// treated as complete, single-shot transfers.
    pub range: Option<ContentRange>,
    /// The `filename` parameter of Content-Disposition, if the header was sent.
    pub file_name: Option<String>,
    /// User-declared object metadata.
    pub property: FileProperty,
}

/// A `bytes <start>-<end>/<size>` triple.
///
/// The ordering of the three integers is not validated here; the range is
/// never used to assemble partial uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: u64,
    pub end: u64,
    pub size: u64,
}

/// User-declared object metadata, read from custom request headers.
///
/// A missing header is recorded as an empty string; completeness is only
/// evaluated by [`FileProperty::is_valid`] when the pipeline decides
/// whether to commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileProperty {
    pub name: String,
    pub hash: String,
    pub creator: String,
    pub sys_id: String,
}

impl FileProperty {
    /// All four fields must be non-empty for an upload to proceed.
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
            && !self.creator.is_empty()
            && !self.hash.is_empty()
            && !self.sys_id.is_empty()
    }

    /// Names of the property headers that were missing or empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.is_empty() {
            missing.push("name");
        }
        if self.hash.is_empty() {
            missing.push("hash");
        }
        if self.creator.is_empty() {
            missing.push("creator");
        }
        if self.sys_id.is_empty() {
            missing.push("sysId");
        }
        missing
    }
}

/// Parse transport and property headers into a [`RequestMeta`].
pub fn parse_meta(headers: &HeaderMap) -> Result<RequestMeta, GatewayError> {
    let (media_type, boundary) = parse_content_type(header_str(headers, "content-type"))?;
    let range = parse_content_range(header_str(headers, "content-range"))?;
    let file_name = parse_content_disposition(header_str(headers, "content-disposition"))?;
    let property = parse_user_properties(headers);

    Ok(RequestMeta {
        media_type,
        boundary,
        range,
        file_name,
        property,
    })
}

/// Read a header value as a string slice; non-UTF-8 values read as absent.
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Parse Content-Type.
///
/// Absent → generic binary type.  Present but not multipart → the generic
/// binary type is still used; only multipart/form-data is recorded verbatim
/// and must carry a `boundary` parameter.
fn parse_content_type(value: Option<&str>) -> Result<(String, Option<String>), GatewayError> {
    let value = match value {
        Some(v) if !v.is_empty() => v,
        _ => return Ok((mime::APPLICATION_OCTET_STREAM.to_string(), None)),
    };

    let parsed: Mime = value
        .parse()
        .map_err(|_| GatewayError::MalformedContentType {
            value: value.to_string(),
        })?;

    if parsed.type_() == mime::MULTIPART && parsed.subtype() == mime::FORM_DATA {
        let boundary = parsed
            .get_param(mime::BOUNDARY)
            .ok_or(GatewayError::MissingBoundary)?;
        Ok((
            format!("{}/{}", parsed.type_(), parsed.subtype()),
            Some(boundary.as_str().to_string()),
        ))
    } else {
        Ok((mime::APPLICATION_OCTET_STREAM.to_string(), None))
    }
}

/// Parse Content-Range.
///
/// Absent is fine; present must match `bytes <start>-<end>/<size>` with
/// three ASCII decimal integers.
fn parse_content_range(value: Option<&str>) -> Result<Option<ContentRange>, GatewayError> {
    let value = match value {
        Some(v) if !v.is_empty() => v,
        _ => return Ok(None),
    };

    let malformed = || GatewayError::MalformedRange {
        value: value.to_string(),
    };

    let spec = value.strip_prefix("bytes ").ok_or_else(malformed)?;
    let (start, rest) = spec.split_once('-').ok_or_else(malformed)?;
    let (end, size) = rest.split_once('/').ok_or_else(malformed)?;

    let start: u64 = start.parse().map_err(|_| malformed())?;
    let end: u64 = end.parse().map_err(|_| malformed())?;
    let size: u64 = size.parse().map_err(|_| malformed())?;

    Ok(Some(ContentRange { start, end, size }))
}

/// Parse Content-Disposition.
///
/// Absent is fine; present must declare a `filename` parameter.
fn parse_content_disposition(value: Option<&str>) -> Result<Option<String>, GatewayError> {
    let value = match value {
        Some(v) if !v.is_empty() => v,
        _ => return Ok(None),
    };

    // Parameters follow the disposition type, `; key=value` each, with the
    // value optionally double-quoted.
    for param in value.split(';').skip(1) {
        if let Some((key, val)) = param.split_once('=') {
            if key.trim().eq_ignore_ascii_case("filename") {
                let val = val.trim().trim_matches('"');
                return Ok(Some(val.to_string()));
            }
        }
    }

    Err(GatewayError::MissingFilename)
}

/// Read the user-defined property headers.
///
/// Each header is read independently; a missing or empty value is recorded
/// as an empty string and logged, never a parse error by itself.
fn parse_user_properties(headers: &HeaderMap) -> FileProperty {
    let property = FileProperty {
        name: header_str(headers, "name").unwrap_or_default().to_string(),
        hash: header_str(headers, "hash").unwrap_or_default().to_string(),
        creator: header_str(headers, "creator")
            .unwrap_or_default()
            .to_string(),
        sys_id: header_str(headers, "sysId").unwrap_or_default().to_string(),
    };

    for field in property.missing_fields() {
        warn!(header = field, "request with empty property header");
    }

    property
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.append(
                axum::http::HeaderName::from_bytes(k.as_bytes()).unwrap(),
                HeaderValue::from_str(v).unwrap(),
            );
        }
        map
    }

    // -- Full-request scenario ------------------------------------------------

    #[test]
    fn test_parse_meta_multipart_upload() {
        let headers = headers(&[
            (
                "content-type",
                "multipart/form-data; boundary=----Zam1WUeLK7vBj4wN",
            ),
            ("content-range", "bytes 512000-1023999/1141216"),
            ("content-disposition", "attachment; filename=\"picture.jpg\""),
        ]);

        let meta = parse_meta(&headers).unwrap();
        assert_eq!(meta.media_type, "multipart/form-data");
        assert_eq!(meta.boundary.as_deref(), Some("----Zam1WUeLK7vBj4wN"));
        assert_eq!(
            meta.range,
            Some(ContentRange {
                start: 512000,
                end: 1023999,
                size: 1141216
            })
        );
        assert_eq!(meta.file_name.as_deref(), Some("picture.jpg"));
    }

    #[test]
    fn test_parse_meta_bare_request() {
        // No transport headers at all: defaults apply, nothing errors.
        let meta = parse_meta(&HeaderMap::new()).unwrap();
        assert_eq!(meta.media_type, "application/octet-stream");
        assert_eq!(meta.boundary, None);
        assert_eq!(meta.range, None);
        assert_eq!(meta.file_name, None);
        assert!(!meta.property.is_valid());
    }

    // -- Content-Type ---------------------------------------------------------

    #[test]
    fn test_content_type_non_multipart_is_generic() {
        let (media_type, boundary) = parse_content_type(Some("image/jpeg")).unwrap();
        assert_eq!(media_type, "application/octet-stream");
        assert_eq!(boundary, None);
    }

    #[test]
    fn test_content_type_multipart_without_boundary() {
        let err = parse_content_type(Some("multipart/form-data")).unwrap_err();
        assert!(matches!(err, GatewayError::MissingBoundary));
    }

    #[test]
    fn test_content_type_unparsable() {
        let err = parse_content_type(Some("not a media type")).unwrap_err();
        assert!(matches!(err, GatewayError::MalformedContentType { .. }));
    }

    // -- Content-Range --------------------------------------------------------

    #[test]
    fn test_content_range_well_formed() {
        let range = parse_content_range(Some("bytes 0-499/1000")).unwrap();
        assert_eq!(
            range,
            Some(ContentRange {
                start: 0,
                end: 499,
                size: 1000
            })
        );
    }

    #[test]
    fn test_content_range_absent() {
        assert_eq!(parse_content_range(None).unwrap(), None);
        assert_eq!(parse_content_range(Some("")).unwrap(), None);
    }

    #[test]
    fn test_content_range_malformed() {
        for bad in [
            "bytes 0-499",          // missing size
            "0-499/1000",           // missing unit prefix
            "bytes a-b/c",          // non-numeric
            "bytes 0-499/",         // empty size
            "bytes=0-499/1000",     // wrong separator after unit
            "bytes -5-10/100",      // negative start
        ] {
            let err = parse_content_range(Some(bad)).unwrap_err();
            assert!(
                matches!(err, GatewayError::MalformedRange { .. }),
                "expected MalformedRange for {bad:?}"
            );
        }
    }

    // -- Content-Disposition --------------------------------------------------

    #[test]
    fn test_content_disposition_filename() {
        let name = parse_content_disposition(Some("attachment; filename=\"a.bin\"")).unwrap();
        assert_eq!(name.as_deref(), Some("a.bin"));

        // Unquoted values are accepted too.
        let name = parse_content_disposition(Some("inline; filename=b.bin")).unwrap();
        assert_eq!(name.as_deref(), Some("b.bin"));
    }

    #[test]
    fn test_content_disposition_without_filename() {
        let err = parse_content_disposition(Some("attachment")).unwrap_err();
        assert!(matches!(err, GatewayError::MissingFilename));

        let err = parse_content_disposition(Some("form-data; name=field1")).unwrap_err();
        assert!(matches!(err, GatewayError::MissingFilename));
    }

    #[test]
    fn test_content_disposition_absent() {
        assert_eq!(parse_content_disposition(None).unwrap(), None);
    }

    // -- Property headers -----------------------------------------------------

    #[test]
    fn test_properties_complete() {
        let headers = headers(&[
            ("name", "a.bin"),
            ("hash", "deadbeef"),
            ("creator", "u1"),
            ("sysId", "s1"),
        ]);
        let property = parse_user_properties(&headers);
        assert!(property.is_valid());
        assert_eq!(property.sys_id, "s1");
        assert!(property.missing_fields().is_empty());
    }

    #[test]
    fn test_properties_missing_are_empty_not_errors() {
        let headers = headers(&[("name", "a.bin"), ("creator", "u1")]);
        let property = parse_user_properties(&headers);
        assert!(!property.is_valid());
        assert_eq!(property.hash, "");
        assert_eq!(property.missing_fields(), vec!["hash", "sysId"]);
    }
}
