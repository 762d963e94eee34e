// src/models/community.rs

//! Community identity and site metadata.

use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{FandomError, Result};

/// Shape a community base URL must have, e.g. `avatar.fandom.com/de`.
const BASE_URL_PATTERN: &str = r"^[a-z0-9-]+\.fandom\.com(/[a-z-]+)*$";

/// General site metadata from the MediaWiki siteinfo endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteInfo {
    /// Site display name
    pub site_name: String,
    /// Server host name
    pub server_name: String,
    /// Content language short code
    #[serde(default = "default_language")]
    pub language: String,
    /// Logo image URL
    #[serde(default)]
    pub logo_url: Option<String>,
    /// Title of the main page
    #[serde(default)]
    pub main_page: Option<String>,
    /// Time zone the wiki is configured with, e.g. `UTC`
    #[serde(default)]
    pub time_zone: Option<String>,
    /// MediaWiki generator string
    #[serde(default)]
    pub generator: Option<String>,
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            site_name: String::new(),
            server_name: String::new(),
            language: default_language(),
            logo_url: None,
            main_page: None,
            time_zone: None,
            generator: None,
        }
    }
}

/// One Fandom community: a wiki in one language edition.
///
/// The `base_url` carries the language path for non-English editions, so
/// `avatar.fandom.com` and `avatar.fandom.com/de` are distinct communities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Community {
    /// Host plus optional language path, without a scheme
    pub base_url: String,
    /// Subdomain identifier, e.g. `avatar`
    pub id: String,
    /// General site metadata
    pub site: SiteInfo,
}

impl Community {
    /// Create a community from an already known metadata set.
    ///
    /// The base URL is validated; no network access happens.
    pub fn new(base_url: impl Into<String>, site: SiteInfo) -> Result<Self> {
        let base_url = base_url.into();
        let id = validate_base_url(&base_url)?;
        Ok(Self { base_url, id, site })
    }

    /// Connect to a community: validate the base URL and fetch its site
    /// metadata from the siteinfo endpoint.
    pub async fn connect(
        client: &reqwest::Client,
        base_url: impl Into<String>,
    ) -> Result<Arc<Self>> {
        let base_url = base_url.into();
        let id = validate_base_url(&base_url)?;
        let url = crate::utils::api_url(
            &base_url,
            &[("action", "query"), ("meta", "siteinfo"), ("siprop", "general")],
        )?;
        let payload = crate::utils::http::get_json(client, url).await?;
        let site = crate::services::parse::site_info(&payload)?;
        log::info!("Connected to {} ({})", site.site_name, base_url);
        Ok(Arc::new(Self { base_url, id, site }))
    }
}

/// Check the base URL shape and extract the subdomain identifier.
fn validate_base_url(base_url: &str) -> Result<String> {
    let pattern =
        Regex::new(BASE_URL_PATTERN).map_err(|e| FandomError::validation(e.to_string()))?;
    if !pattern.is_match(base_url) {
        return Err(FandomError::validation(format!(
            "community URL {base_url:?} does not match \"name.fandom.com[/lang]\""
        )));
    }
    let id = base_url
        .split(".fandom.com")
        .next()
        .unwrap_or_default()
        .to_string();
    if id.len() < 3 || id.len() > 50 {
        return Err(FandomError::validation(format!(
            "community ID {id:?} must be 3 to 50 characters"
        )));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_community_url() {
        let community = Community::new("avatar.fandom.com", SiteInfo::default()).unwrap();
        assert_eq!(community.id, "avatar");
    }

    #[test]
    fn accepts_language_edition_url() {
        let community = Community::new("avatar.fandom.com/de", SiteInfo::default()).unwrap();
        assert_eq!(community.id, "avatar");
        assert_eq!(community.base_url, "avatar.fandom.com/de");
    }

    #[test]
    fn accepts_digits_and_hyphens_in_subdomain() {
        let community = Community::new("half-life2.fandom.com", SiteInfo::default()).unwrap();
        assert_eq!(community.id, "half-life2");
    }

    #[test]
    fn rejects_scheme_prefix() {
        assert!(Community::new("https://avatar.fandom.com", SiteInfo::default()).is_err());
    }

    #[test]
    fn rejects_foreign_host() {
        assert!(Community::new("avatar.wikipedia.org", SiteInfo::default()).is_err());
        assert!(Community::new("avatar.fandom.com.evil.net", SiteInfo::default()).is_err());
    }

    #[test]
    fn rejects_short_and_long_ids() {
        assert!(Community::new("ab.fandom.com", SiteInfo::default()).is_err());
        let long = format!("{}.fandom.com", "a".repeat(51));
        assert!(Community::new(long, SiteInfo::default()).is_err());
    }

    #[test]
    fn rejects_uppercase() {
        assert!(Community::new("Avatar.fandom.com", SiteInfo::default()).is_err());
    }
}
