//! Allow-list and exclusion rules for source documents.

use aoma_core::CoreError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Kind of an allowed source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCategory {
    /// Journals, preprints and standards bodies
    Academic,
    /// Bank and broker research
    FinancialResearch,
    /// Semiconductor vendors
    SemiconductorVendor,
    /// Vehicle manufacturers
    Oem,
    /// Tier-1 suppliers
    Tier1,
}

impl fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceCategory::Academic => "academic",
            SourceCategory::FinancialResearch => "financial_research",
            SourceCategory::SemiconductorVendor => "semiconductor_vendor",
            SourceCategory::Oem => "oem",
            SourceCategory::Tier1 => "tier1",
        };
        write!(f, "{}", s)
    }
}

/// An accepted source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceClassification {
    /// Category of the matched domain
    pub category: SourceCategory,
    /// Name of the matched source
    pub source_name: String,
}

const ALLOWED: &[(SourceCategory, &str, &str)] = &[
    (SourceCategory::Academic, "IEEE", "ieee.org"),
    (SourceCategory::Academic, "arXiv", "arxiv.org"),
    (SourceCategory::Academic, "ACM", "acm.org"),
    (SourceCategory::Academic, "SAE", "sae.org"),
    (SourceCategory::FinancialResearch, "JP Morgan", "jpmorgan.com"),
    (SourceCategory::FinancialResearch, "Goldman Sachs", "goldmansachs.com"),
    (SourceCategory::FinancialResearch, "Morgan Stanley", "morganstanley.com"),
    (SourceCategory::FinancialResearch, "McKinsey", "mckinsey.com"),
    (SourceCategory::SemiconductorVendor, "Texas Instruments", "ti.com"),
    (SourceCategory::SemiconductorVendor, "NXP", "nxp.com"),
    (SourceCategory::SemiconductorVendor, "Infineon", "infineon.com"),
    (SourceCategory::SemiconductorVendor, "Qualcomm", "qualcomm.com"),
    (SourceCategory::SemiconductorVendor, "NVIDIA", "nvidia.com"),
    (SourceCategory::SemiconductorVendor, "Intel", "intel.com"),
    (SourceCategory::SemiconductorVendor, "AMD", "amd.com"),
    (SourceCategory::SemiconductorVendor, "Mobileye", "mobileye.com"),
    (SourceCategory::Oem, "Tesla", "tesla.com"),
    (SourceCategory::Oem, "GM", "gm.com"),
    (SourceCategory::Oem, "Ford", "ford.com"),
    (SourceCategory::Oem, "Rivian", "rivian.com"),
    (SourceCategory::Oem, "SEC filings", "sec.gov"),
    (SourceCategory::Tier1, "Bosch", "bosch.com"),
    (SourceCategory::Tier1, "Continental", "continental.com"),
    (SourceCategory::Tier1, "Aptiv", "aptiv.com"),
    (SourceCategory::Tier1, "Magna", "magna.com"),
];

const EXCLUDED: &[&str] = &[
    r"blog\.",
    r"/blog/",
    r"medium\.com",
    r"linkedin\.com/pulse",
    r"twitter\.com",
    r"facebook\.com",
];

/// Decides which source URLs may be used
#[derive(Debug, Clone)]
pub struct SourcePolicy {
    allowed: Vec<(SourceCategory, String, String)>,
    excluded: Vec<Regex>,
}

impl SourcePolicy {
    /// A policy with no rules. Every URL is rejected.
    pub fn empty() -> Self {
        Self {
            allowed: Vec::new(),
            excluded: Vec::new(),
        }
    }

    /// The standard ADAS research policy
    pub fn standard() -> Result<Self, CoreError> {
        let mut policy = Self::empty();
        for (category, name, domain) in ALLOWED {
            policy = policy.allow(*category, *name, *domain);
        }
        for pattern in EXCLUDED {
            policy = policy.exclude(pattern)?;
        }
        Ok(policy)
    }

    /// Allow a domain and its subdomains
    pub fn allow(mut self, category: SourceCategory, name: impl Into<String>, domain: impl Into<String>) -> Self {
        self.allowed
            .push((category, name.into(), domain.into().to_ascii_lowercase()));
        self
    }

    /// Reject URLs matching a case-insensitive pattern
    pub fn exclude(mut self, pattern: &str) -> Result<Self, CoreError> {
        let regex = Regex::new(&format!("(?i){}", pattern))
            .map_err(|e| CoreError::ConfigurationError(format!("Invalid exclusion pattern {}: {}", pattern, e)))?;
        self.excluded.push(regex);
        Ok(self)
    }

    /// Classify a URL, or give the reason it is rejected.
    ///
    /// Exclusions take precedence over the allow-list.
    pub fn classify(&self, url: &str) -> Result<SourceClassification, String> {
        if let Some(pattern) = self.excluded.iter().find(|r| r.is_match(url)) {
            return Err(format!("Matches excluded pattern: {}", pattern.as_str().trim_start_matches("(?i)")));
        }

        let host = host_of(url).ok_or_else(|| format!("Not a URL: {}", url))?;
        self.allowed
            .iter()
            .find(|(_, _, domain)| host == *domain || host.ends_with(&format!(".{}", domain)))
            .map(|(category, name, _)| SourceClassification {
                category: *category,
                source_name: name.clone(),
            })
            .ok_or_else(|| format!("Domain not in allowed list: {}", host))
    }

    /// Whether a URL is acceptable
    pub fn is_allowed(&self, url: &str) -> bool {
        self.classify(url).is_ok()
    }
}

/// Lowercased host of a URL, with or without a scheme
fn host_of(url: &str) -> Option<String> {
    let url = url.trim();
    let host = parsed_host(url).or_else(|| {
        if url.contains("://") {
            None
        } else {
            parsed_host(&format!("https://{}", url))
        }
    })?;
    if !host.contains('.') {
        return None;
    }
    Some(host.trim_end_matches('.').to_ascii_lowercase())
}

fn parsed_host(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed.host_str().filter(|h| !h.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> SourcePolicy {
        SourcePolicy::standard().unwrap()
    }

    #[test]
    fn test_allowed_domains_are_classified() {
        let c = policy().classify("https://ieeexplore.ieee.org/document/123").unwrap();
        assert_eq!(c.category, SourceCategory::Academic);
        assert_eq!(c.source_name, "IEEE");

        let c = policy().classify("https://www.NXP.com/products/radar").unwrap();
        assert_eq!(c.category, SourceCategory::SemiconductorVendor);
    }

    #[test]
    fn test_exclusions_win_over_allow_list() {
        let reason = policy().classify("https://blog.nvidia.com/post").unwrap_err();
        assert_eq!(reason, r"Matches excluded pattern: blog\.");
        assert!(!policy().is_allowed("https://www.linkedin.com/pulse/adas-hype"));
        assert!(!policy().is_allowed("https://medium.com/@someone/radar"));
    }

    #[test]
    fn test_suffix_match_does_not_accept_lookalikes() {
        assert!(policy().classify("https://algm.com/report").is_err());
        assert!(policy().classify("https://notieee.org").is_err());
        assert!(policy().is_allowed("gm.com/investors"));
    }

    #[test]
    fn test_host_is_taken_from_the_parsed_authority() {
        assert_eq!(
            policy().classify(r"https://evil.example\@ieee.org/paper").unwrap_err(),
            "Domain not in allowed list: evil.example"
        );
        assert_eq!(
            policy().classify("https://ieee.org@evil.example/paper").unwrap_err(),
            "Domain not in allowed list: evil.example"
        );
        assert!(policy().is_allowed("https://user@ieeexplore.ieee.org:443/document/1"));
    }

    #[test]
    fn test_unknown_and_malformed_urls() {
        assert_eq!(
            policy().classify("https://example.com/x").unwrap_err(),
            "Domain not in allowed list: example.com"
        );
        assert!(policy().classify("not a url").is_err());
        assert!(SourcePolicy::empty().classify("https://ieee.org").is_err());
    }

    #[test]
    fn test_invalid_pattern_is_a_configuration_error() {
        let err = SourcePolicy::empty().exclude("(unclosed").unwrap_err();
        assert!(matches!(err, CoreError::ConfigurationError(_)));
    }

    #[test]
    fn test_category_display() {
        assert_eq!(SourceCategory::FinancialResearch.to_string(), "financial_research");
    }
}
