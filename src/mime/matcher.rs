//! MIME matching primitives.

/// Splits a MIME string into its type and (optional) subtype.
fn split(mime: &str) -> (&str, Option<&str>) {
    let mut parts = mime.split('/');
    let media_type = parts.next().unwrap_or_default();
    (media_type, parts.next())
}

/// Checks whether two MIME types are compatible.
///
/// Two types are compatible if they are identical, or if one side uses `*`
/// as its type and the subtypes are equal, or if one side uses `*` as its
/// subtype and the types are equal.
///
/// ```
/// use microrest_rs::mime::is_compatible;
///
/// assert!(is_compatible("text/json", "*/json"));
/// assert!(is_compatible("*/json", "text/json"));
/// assert!(!is_compatible("text/json", "text/xml"));
/// ```
pub fn is_compatible(source: &str, target: &str) -> bool {
    if source == target {
        return true;
    }

    let (source_type, source_subtype) = split(source);
    let (target_type, target_subtype) = split(target);

    if (target_type == "*" || source_type == "*") && target_subtype == source_subtype {
        return true;
    }

    (target_subtype == Some("*") || source_subtype == Some("*")) && target_type == source_type
}

/// Normalizes a media type header value into its list of bare MIME types.
///
/// The value is split on `,`, backslash escapes are dropped, parameters
/// such as quality values are cut off at the first `;` and whitespace is
/// trimmed. Returns `None` when the header is absent.
pub fn normalize(header_value: Option<&str>) -> Option<Vec<String>> {
    let header_value = header_value?;
    Some(
        header_value
            .split(',')
            .map(|entry| {
                let unescaped = entry.replace('\\', "");
                unescaped
                    .split(';')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string()
            })
            .collect(),
    )
}

/// Checks that a MIME type has the `type/subtype` shape.
pub fn is_valid(mime: &str) -> bool {
    mime.split('/').count() >= 2
}

/// Decides whether a request is acceptable to a handler configuration.
///
/// The request's `Accept` value must be compatible with `produces` and its
/// `Content-Type` value with `consumes`:
///
/// - an absent `Accept` header, or one containing `*/*`, accepts anything;
///   otherwise some accepted type must be compatible with some produced type,
///   which fails outright when `produces` is absent or empty.
/// - absent `consumes`, or `consumes` containing `*/*` or the bare `*`,
///   accepts any content; otherwise some content type must be compatible
///   with some consumed type.
pub fn match_media_type(
    accept: Option<&str>,
    content_type: Option<&str>,
    produces: Option<&[String]>,
    consumes: Option<&[String]>,
) -> bool {
    let produce_matched = match normalize(accept) {
        None => true,
        Some(accepts) if accepts.iter().any(|mime| mime == "*/*") => true,
        Some(accepts) => produces.is_some_and(|produces| intersects(&accepts, produces)),
    };

    let consume_matched = match consumes {
        None => true,
        Some(consumes) if consumes.iter().any(|mime| mime == "*" || mime == "*/*") => true,
        Some(consumes) => {
            normalize(content_type).is_some_and(|content_types| intersects(&content_types, consumes))
        }
    };

    produce_matched && consume_matched
}

/// True when at least one request type is compatible with one declared type.
fn intersects(requested: &[String], declared: &[String]) -> bool {
    requested
        .iter()
        .any(|request_mime| declared.iter().any(|mime| is_compatible(request_mime, mime)))
}
