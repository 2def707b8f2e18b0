//! Identifier detection and title heuristics shared by seed resolution and mapping.

use std::sync::LazyLock;

use regex::Regex;

/// Compiles a regex at static init; panics on invalid pattern.
pub fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

static DOI_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"(?i)^10\.\d{4,9}/\S+$"));

static PRIMARY_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?i)openalex\.org/(?:works/)?(W\d+)\b"));
static PRIMARY_ID_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"(?i)^W\d+$"));

static SECONDARY_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r"/paper/[^/]+/([0-9a-fA-F]{16,}|[A-Za-z0-9\-]+)$")
});
static SECONDARY_HEX_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"^[0-9a-fA-F]{16,}$"));
static SECONDARY_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"^[A-Za-z0-9\-]{10,}$"));

/// Journal abbreviations and venue words that make a "title" useless as a
/// search query when little else surrounds them.
static GENERIC_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(concat!(
        r"(?i)\b(",
        r"preprint|proceedings|proc\.|",
        r"phys\.?\s*rev\.?(?:\s*lett\.?)?|",
        r"phys\.?\s*lett\.?(?:\s*[ab])?|",
        r"mod\.?\s*phys\.?\s*lett\.?|",
        r"ann\.?\s*phys\.?|",
        r"nucl\.?\s*phys\.?(?:\s*[ab])?|",
        r"class\.?\s*quant\.?\s*grav\.?|",
        r"(?:commun|comm)\.?\s*math\.?\s*phys\.?|",
        r"int\.?\s*j\.?|jhep|j\.?\s*phys\.?",
        r")\b",
    ))
});

/// Old-style preprint identifiers (`hep-th/9711200`) that some catalogs list as titles.
static PREPRINT_ID_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r"(?i)^\s*(?:hep-(?:th|ph)|gr-qc|astro-ph|cond-mat)/\d{7}\s*$")
});

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"\w+"));

/// Generic-phrase titles with at most this many words are low-information.
const GENERIC_TITLE_MAX_WORDS: usize = 4;

/// Titles with fewer words than this are low-information.
const MIN_TITLE_WORDS: usize = 3;

/// Returns true for a bare DOI (`10.xxxx/...`).
#[must_use]
pub fn is_doi(value: &str) -> bool {
    DOI_RE.is_match(value.trim())
}

/// Extracts a primary work ID from a bare ID or a catalog URL.
///
/// ```
/// use refcrawl_core::resolver::patterns::extract_primary_id;
///
/// assert_eq!(extract_primary_id("https://openalex.org/W2741809807").as_deref(), Some("W2741809807"));
/// assert_eq!(extract_primary_id("w123").as_deref(), Some("W123"));
/// assert_eq!(extract_primary_id("10.1234/x"), None);
/// ```
#[must_use]
pub fn extract_primary_id(value: &str) -> Option<String> {
    let value = value.trim();
    let raw = if let Some(caps) = PRIMARY_URL_RE.captures(value) {
        caps.get(1).map(|m| m.as_str())
    } else if PRIMARY_ID_RE.is_match(value) {
        Some(value)
    } else {
        None
    }?;
    Some(format!("W{}", &raw[1..]))
}

/// Extracts a secondary paper ID from a bare ID or a paper URL.
#[must_use]
pub fn extract_secondary_id(value: &str) -> Option<String> {
    let value = value.trim();
    if let Some(caps) = SECONDARY_URL_RE.captures(value) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }
    if SECONDARY_HEX_RE.is_match(value) || SECONDARY_TOKEN_RE.is_match(value) {
        return Some(value.to_string());
    }
    None
}

/// Trims a DOI and strips a `doi.org` URL prefix; empty input yields `None`.
#[must_use]
pub fn normalize_doi(doi: Option<&str>) -> Option<String> {
    let doi = doi?.trim();
    let lower = doi.to_ascii_lowercase();
    let stripped = ["https://doi.org/", "http://doi.org/"]
        .iter()
        .find(|prefix| lower.starts_with(*prefix))
        .map_or(doi, |prefix| &doi[prefix.len()..]);
    if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_string())
    }
}

/// Returns true when `title` is too short or generic to be a useful search query.
///
/// ```
/// use refcrawl_core::resolver::patterns::is_low_information_title;
///
/// assert!(is_low_information_title(Some("Phys. Rev. Lett.")));
/// assert!(is_low_information_title(Some("hep-th/9711200")));
/// assert!(!is_low_information_title(Some("The large N limit of superconformal field theories")));
/// ```
#[must_use]
pub fn is_low_information_title(title: Option<&str>) -> bool {
    let Some(title) = title.filter(|t| !t.trim().is_empty()) else {
        return true;
    };
    if PREPRINT_ID_TITLE_RE.is_match(title) {
        return true;
    }
    let words = WORD_RE.find_iter(title).count();
    if GENERIC_TITLE_RE.is_match(title) && words <= GENERIC_TITLE_MAX_WORDS {
        return true;
    }
    words < MIN_TITLE_WORDS
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== DOI Tests ====================

    #[test]
    fn test_is_doi() {
        assert!(is_doi("10.1103/PhysRevLett.80.4859"));
        assert!(is_doi("  10.7717/peerj.4375 "));
        assert!(!is_doi("https://doi.org/10.7717/peerj.4375"));
        assert!(!is_doi("10.12/short"));
        assert!(!is_doi("Attention is all you need"));
    }

    #[test]
    fn test_normalize_doi_strips_resolver_prefix() {
        assert_eq!(
            normalize_doi(Some("https://doi.org/10.7717/peerj.4375")).as_deref(),
            Some("10.7717/peerj.4375")
        );
        assert_eq!(
            normalize_doi(Some("HTTPS://DOI.ORG/10.1234/X")).as_deref(),
            Some("10.1234/X")
        );
        assert_eq!(normalize_doi(Some(" 10.1234/x ")).as_deref(), Some("10.1234/x"));
        assert_eq!(normalize_doi(Some("   ")), None);
        assert_eq!(normalize_doi(None), None);
    }

    // ==================== Identifier Tests ====================

    #[test]
    fn test_extract_primary_id_variants() {
        assert_eq!(
            extract_primary_id("https://openalex.org/works/W42").as_deref(),
            Some("W42")
        );
        assert_eq!(extract_primary_id("W42").as_deref(), Some("W42"));
        assert_eq!(extract_primary_id("W42x"), None);
        assert_eq!(extract_primary_id("A42"), None);
    }

    #[test]
    fn test_extract_secondary_id_from_url() {
        assert_eq!(
            extract_secondary_id(
                "https://www.semanticscholar.org/paper/Attention-Is-All/204e3073870fae3d05bcbc2f6a8e263d9b72e776"
            )
            .as_deref(),
            Some("204e3073870fae3d05bcbc2f6a8e263d9b72e776")
        );
    }

    #[test]
    fn test_extract_secondary_id_bare_tokens() {
        assert_eq!(
            extract_secondary_id("204e3073870fae3d05bcbc2f6a8e263d9b72e776").as_deref(),
            Some("204e3073870fae3d05bcbc2f6a8e263d9b72e776")
        );
        assert_eq!(extract_secondary_id("short"), None);
        assert_eq!(extract_secondary_id("two words here"), None);
        assert_eq!(extract_secondary_id("10.1103/PhysRevD.1"), None);
    }

    // ==================== Low-Information Title Tests ====================

    #[test]
    fn test_low_information_journal_abbreviations() {
        assert!(is_low_information_title(Some("Phys. Rev. Lett.")));
        assert!(is_low_information_title(Some("Nucl. Phys. B")));
        assert!(is_low_information_title(Some("JHEP 05 (2003) 013")));
        assert!(is_low_information_title(Some("Commun. Math. Phys. 104")));
    }

    #[test]
    fn test_low_information_preprint_identifier() {
        assert!(is_low_information_title(Some("hep-th/9711200")));
        assert!(is_low_information_title(Some(" gr-qc/0101001 ")));
    }

    #[test]
    fn test_low_information_short_or_empty() {
        assert!(is_low_information_title(None));
        assert!(is_low_information_title(Some("")));
        assert!(is_low_information_title(Some("   ")));
        assert!(is_low_information_title(Some("Dark energy")));
    }

    #[test]
    fn test_descriptive_titles_are_informative() {
        assert!(!is_low_information_title(Some(
            "The large N limit of superconformal field theories"
        )));
        assert!(!is_low_information_title(Some("Anti de Sitter space and holography")));
        // Generic word, but enough surrounding context
        assert!(!is_low_information_title(Some(
            "Proceedings of the royal society on quantum gravity"
        )));
    }
}
