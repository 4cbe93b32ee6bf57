//! Featured-level HTTP client (`spec.md` §6 "featured-level ops
//! (admin-gated)"). A thin client-side companion to the `ServerDirectory`
//! (`directory.rs`), hitting the same central server but a disjoint set of
//! endpoints; kept separate because only the admin paths carry an authkey.

use std::time::Duration;

use serde::Deserialize;

use crate::auth::AuthKey;

const HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum FeaturedLevelError {
    #[error("featured-level request failed: {0}")]
    RequestFailed(String),
    #[error("featured-level response was malformed: {0}")]
    MalformedResponse(String),
    #[error("admin operation requires an authenticated session")]
    NotAuthenticated,
}

/// One curated level and its rate tier, as returned by `/flevel/*`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeaturedLevel {
    pub level_id: i32,
    pub level_name: String,
    pub creator_name: String,
    /// Rate tier, e.g. 1 = Epic, 2 = Legendary, 3 = Mythic; opaque to this
    /// crate beyond display ordering.
    pub rate_tier: u8,
    /// Unix seconds the level became featured; the server-declared
    /// ordering `spec.md` §8's paging property is checked against.
    pub featured_at: i64,
}

#[derive(Debug, Deserialize)]
struct HistoryPage {
    levels: Vec<FeaturedLevel>,
    page: u32,
    total_pages: u32,
}

/// One page of the featured-level history, with enough context to detect
/// whether the caller has reached the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeaturedLevelPage {
    pub levels: Vec<FeaturedLevel>,
    pub page: u32,
    pub total_pages: u32,
}

impl FeaturedLevelPage {
    pub fn is_last(&self) -> bool {
        self.page + 1 >= self.total_pages
    }
}

/// Talks to one central server's `/flevel/*` endpoints.
pub struct FeaturedLevelClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl FeaturedLevelClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("globed-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("reqwest client with a fixed timeout and user agent should always build");
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// `GET /flevel/current`.
    pub fn current(&self) -> Result<FeaturedLevel, FeaturedLevelError> {
        let resp = self
            .http
            .get(format!("{}/flevel/current", self.base_url))
            .query(&[("protocol", PROTOCOL_VERSION.to_string())])
            .send()
            .map_err(|e| FeaturedLevelError::RequestFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(FeaturedLevelError::RequestFailed(format!("status {}", resp.status())));
        }

        resp.json().map_err(|e| FeaturedLevelError::MalformedResponse(e.to_string()))
    }

    /// `GET /flevel/historyv2?page=`. Pages are zero-indexed; the caller
    /// stops once [`FeaturedLevelPage::is_last`] returns true.
    pub fn history_page(&self, page: u32) -> Result<FeaturedLevelPage, FeaturedLevelError> {
        let resp = self
            .http
            .get(format!("{}/flevel/historyv2", self.base_url))
            .query(&[("page", page.to_string()), ("protocol", PROTOCOL_VERSION.to_string())])
            .send()
            .map_err(|e| FeaturedLevelError::RequestFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(FeaturedLevelError::RequestFailed(format!("status {}", resp.status())));
        }

        let parsed: HistoryPage = resp.json().map_err(|e| FeaturedLevelError::MalformedResponse(e.to_string()))?;
        Ok(FeaturedLevelPage {
            levels: parsed.levels,
            page: parsed.page,
            total_pages: parsed.total_pages,
        })
    }

    /// Fetches every history page in order, stopping at the server-declared
    /// last page. Used by the "featured-level paging" testable property:
    /// the caller can assert no level id appears twice across the result.
    pub fn full_history(&self) -> Result<Vec<FeaturedLevel>, FeaturedLevelError> {
        let mut all = Vec::new();
        let mut page = 0;
        loop {
            let fetched = self.history_page(page)?;
            let is_last = fetched.is_last();
            all.extend(fetched.levels);
            if is_last {
                break;
            }
            page += 1;
        }
        Ok(all)
    }

    /// `POST /flevel/replace?...`: admin-gated, requires the caller's
    /// authkey-derived TOTP as proof of an admin session.
    pub fn replace(&self, identity: &crate::auth::AccountIdentity, authkey: &AuthKey, level_id: i32, rate_tier: u8) -> Result<(), FeaturedLevelError> {
        let totp = crate::crypto::totp::generate(&authkey.0).map_err(|_| FeaturedLevelError::NotAuthenticated)?;

        let resp = self
            .http
            .post(format!("{}/flevel/replace", self.base_url))
            .query(&[
                ("aid", identity.account_id.to_string()),
                ("uid", identity.user_id.to_string()),
                ("aname", identity.account_name.clone()),
                ("authkey", totp),
                ("level_id", level_id.to_string()),
                ("rate_tier", rate_tier.to_string()),
            ])
            .send()
            .map_err(|e| FeaturedLevelError::RequestFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(FeaturedLevelError::RequestFailed(format!("status {}", resp.status())));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_reports_last_when_page_index_reaches_total() {
        let page = FeaturedLevelPage {
            levels: Vec::new(),
            page: 2,
            total_pages: 3,
        };
        assert!(page.is_last());

        let not_last = FeaturedLevelPage {
            levels: Vec::new(),
            page: 0,
            total_pages: 3,
        };
        assert!(!not_last.is_last());
    }

    #[test]
    fn single_page_history_is_last_by_definition() {
        let page = FeaturedLevelPage {
            levels: Vec::new(),
            page: 0,
            total_pages: 1,
        };
        assert!(page.is_last());
    }
}
