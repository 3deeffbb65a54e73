//! Detail navigation targets and QR image URLs.
use anyhow::{Context, Result};
use reqwest::Url;

use crate::config::Config;

/// Where a record's public profile lives.
#[derive(Debug, Clone)]
pub struct LinkTarget {
    public_base: Url,
    profile_path: String,
}

impl LinkTarget {
    pub fn new(public_base: Url, profile_path: &str) -> Self {
        Self {
            public_base,
            profile_path: profile_path.trim_start_matches('/').to_string(),
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let base = Url::parse(&cfg.site.public_base_url).context("invalid site.public_base_url")?;
        Ok(Self::new(base, &cfg.site.profile_path))
    }

    /// Relative link used inside the exported pages.
    pub fn profile_href(&self, id: &str) -> String {
        let mut scratch = self.public_base.clone();
        scratch.query_pairs_mut().clear().append_pair("id", id);
        format!("{}?{}", self.profile_path, scratch.query().unwrap_or_default())
    }

    /// Absolute portfolio URL, encoded into QR codes.
    pub fn portfolio_url(&self, id: &str) -> Option<Url> {
        let mut url = self.public_base.join(&self.profile_path).ok()?;
        url.query_pairs_mut().clear().append_pair("id", id);
        Some(url)
    }
}

/// External QR image service.
#[derive(Debug, Clone)]
pub struct QrService {
    endpoint: Url,
    size: u32,
}

impl QrService {
    pub fn new(endpoint: Url, size: u32) -> Self {
        Self { endpoint, size }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let endpoint = Url::parse(&cfg.site.qr_service).context("invalid site.qr_service")?;
        Ok(Self::new(endpoint, cfg.site.qr_size))
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn image_url(&self, data: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("size", &format!("{0}x{0}", self.size))
            .append_pair("data", data);
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links() -> LinkTarget {
        LinkTarget::new(
            Url::parse("https://example.github.io/artisans-demo/").unwrap(),
            "artisan.html",
        )
    }

    #[test]
    fn profile_href_is_relative_and_encoded() {
        assert_eq!(links().profile_href("A1"), "artisan.html?id=A1");
        assert_eq!(links().profile_href("a b&c"), "artisan.html?id=a+b%26c");
    }

    #[test]
    fn portfolio_url_resolves_against_base() {
        let url = links().portfolio_url("A1").unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.github.io/artisans-demo/artisan.html?id=A1"
        );
    }

    #[test]
    fn qr_url_embeds_encoded_payload() {
        let qr = QrService::new(
            Url::parse("https://api.qrserver.com/v1/create-qr-code/").unwrap(),
            120,
        );
        let url = qr.image_url("https://example.github.io/artisan.html?id=A1");
        assert_eq!(
            url.as_str(),
            "https://api.qrserver.com/v1/create-qr-code/?size=120x120&data=https%3A%2F%2Fexample.github.io%2Fartisan.html%3Fid%3DA1"
        );
    }
}
