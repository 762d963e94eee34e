// src/utils/mod.rs

//! Utility functions and helpers.

pub mod http;

use url::Url;

use crate::error::Result;

/// Build an `api.php` URL for a community with percent-encoded query pairs.
///
/// `format=json` is always appended.
pub fn api_url(base_url: &str, params: &[(&str, &str)]) -> Result<Url> {
    let mut url = Url::parse(&format!("https://{base_url}/api.php"))?;
    append_query(&mut url, params);
    Ok(url)
}

/// Build a `wikia.php` controller URL with percent-encoded query pairs.
///
/// `format=json` is always appended.
pub fn wikia_url(
    base_url: &str,
    controller: &str,
    method: &str,
    params: &[(&str, &str)],
) -> Result<Url> {
    let mut url = Url::parse(&format!("https://{base_url}/wikia.php"))?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("controller", controller);
        pairs.append_pair("method", method);
    }
    append_query(&mut url, params);
    Ok(url)
}

fn append_query(url: &mut Url, params: &[(&str, &str)]) {
    let mut pairs = url.query_pairs_mut();
    pairs.extend_pairs(params);
    pairs.append_pair("format", "json");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_encodes_params() {
        let url = api_url(
            "test.fandom.com",
            &[("action", "query"), ("rcuser", "A User")],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://test.fandom.com/api.php?action=query&rcuser=A+User&format=json"
        );
    }

    #[test]
    fn test_api_url_keeps_language_path() {
        let url = api_url("avatar.fandom.com/de", &[("action", "query")]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://avatar.fandom.com/de/api.php?action=query&format=json"
        );
    }

    #[test]
    fn test_wikia_url_orders_controller_first() {
        let url = wikia_url(
            "test.fandom.com",
            "DiscussionPost",
            "getPosts",
            &[("containerType", "FORUM"), ("limit", "5")],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://test.fandom.com/wikia.php?controller=DiscussionPost&method=getPosts&containerType=FORUM&limit=5&format=json"
        );
    }
}
