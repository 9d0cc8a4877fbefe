use std::collections::BTreeMap;
use url::form_urlencoded;

/// Merge query parameters into a URL.
///
/// Parameters already present in the URL are kept unless overridden by a new
/// value for the same key. The resulting query string is sorted by key so
/// generated URLs are deterministic. The rest of the URL is left untouched.
pub fn add_querystring_to_url<I, K, V>(url: &str, params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: ToString,
{
    let (rest, fragment) = match url.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (url, None),
    };
    let (base, query) = match rest.split_once('?') {
        Some((base, query)) => (base, query),
        None => (rest, ""),
    };

    // blank values already in the URL are dropped, new ones are kept
    let mut merged: BTreeMap<String, String> = form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .filter(|(_, value)| !value.is_empty())
        .collect();
    for (key, value) in params {
        merged.insert(key.into(), value.to_string());
    }

    let mut out = base.to_string();
    if !merged.is_empty() {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(merged.iter())
            .finish();
        out.push('?');
        out.push_str(&encoded);
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}
