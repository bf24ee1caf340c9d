//! Candidate roster fetching.
//!
//! The eligibility list is published as a newline-delimited text file.
//! Fetching it is the only run-level fatal external call: on failure the run
//! aborts with no state mutation and is retried at the next cadence.

use async_trait::async_trait;
use reqwest::Client;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::info;

use crate::error::FetchError;
use crate::types::Address;

/// Source of the eligibility list
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Fetch the full list of eligible addresses, normalized and
    /// de-duplicated (first occurrence wins, order preserved).
    async fn fetch(&self) -> Result<Vec<Address>, FetchError>;
}

/// HTTP-backed candidate source
pub struct HttpCandidateSource {
    url: String,
    client: Client,
}

impl HttpCandidateSource {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.to_string(),
            client,
        })
    }
}

#[async_trait]
impl CandidateSource for HttpCandidateSource {
    async fn fetch(&self) -> Result<Vec<Address>, FetchError> {
        info!("⬇️  Fetching eligibility list from {}", self.url);

        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Http(response.status()));
        }

        let body = response.text().await?;
        Ok(parse_address_list(&body))
    }
}

/// Split a newline-delimited body into normalized unique addresses
pub fn parse_address_list(body: &str) -> Vec<Address> {
    let mut seen = BTreeSet::new();
    let mut addresses = Vec::new();

    for line in body.lines() {
        if let Some(address) = Address::parse(line) {
            if seen.insert(address.clone()) {
                addresses.push(address);
            }
        }
    }

    addresses
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_and_orders() {
        let body = "0xAA\n0xbb\n  0xCC  \n";
        let parsed = parse_address_list(body);

        let strings: Vec<_> = parsed.iter().map(|a| a.as_str()).collect();
        assert_eq!(strings, vec!["0xaa", "0xbb", "0xcc"]);
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let body = "\n0xaa\n\n\n0xbb\n   \n";
        assert_eq!(parse_address_list(body).len(), 2);
    }

    #[test]
    fn test_parse_dedups_first_wins() {
        let body = "0xbb\n0xAA\n0xBB\n0xaa\n";
        let parsed = parse_address_list(body);

        let strings: Vec<_> = parsed.iter().map(|a| a.as_str()).collect();
        assert_eq!(strings, vec!["0xbb", "0xaa"]);
    }

    #[test]
    fn test_parse_empty_body() {
        assert!(parse_address_list("").is_empty());
    }
}
