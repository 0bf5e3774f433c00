use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Confidence assigned by each matching strategy, on a 0-100 scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub reference_confidence: u8,
    /// Phone match where an outstanding invoice equals the amount.
    pub phone_invoice_confidence: u8,
    /// Phone match where the lease's monthly rent equals the amount.
    pub phone_rent_confidence: u8,
    /// Landlord channel plus the payer's account reference naming the lease.
    pub channel_account_confidence: u8,
    /// Landlord channel with a single lease expecting the amount.
    pub channel_amount_confidence: u8,
    pub partial_min_confidence: u8,
    pub partial_max_confidence: u8,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            reference_confidence: 100,
            phone_invoice_confidence: 95,
            phone_rent_confidence: 90,
            channel_account_confidence: 85,
            channel_amount_confidence: 75,
            partial_min_confidence: 50,
            partial_max_confidence: 70,
        }
    }
}

impl MatcherConfig {
    /// Parses a TOML table; absent keys keep their defaults.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: MatcherConfig = toml::from_str(text)?;
        Ok(config.validated())
    }

    /// Clamps every value to 100 and orders the partial-payment range.
    pub fn validated(mut self) -> Self {
        for value in [
            &mut self.reference_confidence,
            &mut self.phone_invoice_confidence,
            &mut self.phone_rent_confidence,
            &mut self.channel_account_confidence,
            &mut self.channel_amount_confidence,
            &mut self.partial_min_confidence,
            &mut self.partial_max_confidence,
        ] {
            *value = (*value).min(100);
        }
        if self.partial_min_confidence > self.partial_max_confidence {
            std::mem::swap(
                &mut self.partial_min_confidence,
                &mut self.partial_max_confidence,
            );
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        assert_eq!(MatcherConfig::from_toml("").unwrap(), MatcherConfig::default());
    }

    #[test]
    fn partial_keys_override() {
        let config = MatcherConfig::from_toml("channel_amount_confidence = 70\n").unwrap();
        assert_eq!(config.channel_amount_confidence, 70);
        assert_eq!(config.reference_confidence, 100);
    }

    #[test]
    fn values_are_clamped_and_range_ordered() {
        let config = MatcherConfig::from_toml(
            "reference_confidence = 250\npartial_min_confidence = 80\npartial_max_confidence = 60\n",
        )
        .unwrap();
        assert_eq!(config.reference_confidence, 100);
        assert_eq!(config.partial_min_confidence, 60);
        assert_eq!(config.partial_max_confidence, 80);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(MatcherConfig::from_toml("reference_confidence = \"high\"").is_err());
    }
}
