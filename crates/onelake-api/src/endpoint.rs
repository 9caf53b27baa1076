//! Request URL construction.

use url::Url;

/// Splice `endpoint` onto `base` and append `params` as the query string.
///
/// When the first endpoint segment already appears among the base URL's path
/// segments, the base is cut at that position so the shared segments are not
/// repeated. Otherwise the endpoint is appended to the full base path.
///
/// `endpoint` holds plain, unencoded segment names; each is percent-encoded
/// exactly once here.
pub fn full_url(base: &Url, endpoint: &str, params: &[(&str, &str)]) -> Result<Url, url::ParseError> {
    let endpoint_segments: Vec<&str> = endpoint.split('/').filter(|s| !s.is_empty()).collect();
    let base_segments: Vec<&str> = base
        .path_segments()
        .ok_or(url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .filter(|s| !s.is_empty())
        .collect();

    let keep = endpoint_segments
        .first()
        .and_then(|first| base_segments.iter().position(|s| s == first))
        .unwrap_or(base_segments.len());

    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .clear()
        .extend(&base_segments[..keep])
        .extend(&endpoint_segments);

    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params);
    }
    Ok(url)
}
