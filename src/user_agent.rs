//! Shared User-Agent string for catalog HTTP clients.
//!
//! Both catalogs ask API consumers to identify themselves; every request sent
//! by the crawler carries the same header.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/refcrawl";

/// Default User-Agent for catalog requests.
#[must_use]
pub(crate) fn default_catalog_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("refcrawl/{version} (citation-graph-crawler; +{PROJECT_UA_URL})")
}
