use serde::{Deserialize, Serialize};
use std::fmt;

/// Which matching strategy produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Reference,
    PhoneAmount,
    ChannelAmount,
    PhonePartial,
}

impl MatchMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchMethod::Reference => "reference",
            MatchMethod::PhoneAmount => "phone_amount",
            MatchMethod::ChannelAmount => "channel_amount",
            MatchMethod::PhonePartial => "phone_partial",
        }
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MatchMethod {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reference" => Ok(MatchMethod::Reference),
            "phone_amount" => Ok(MatchMethod::PhoneAmount),
            "channel_amount" => Ok(MatchMethod::ChannelAmount),
            "phone_partial" => Ok(MatchMethod::PhonePartial),
            other => Err(format!("Unknown match method: '{other}'")),
        }
    }
}

/// The matcher's decision for one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub matched: bool,
    pub invoice_id: Option<String>,
    pub lease_id: Option<String>,
    /// 0–100.
    pub confidence: u8,
    pub method: Option<MatchMethod>,
    /// Audit trail: the winning rationale, or why every strategy failed.
    pub reasons: Vec<String>,
}

impl ReconciliationResult {
    pub fn matched(
        method: MatchMethod,
        confidence: u8,
        lease_id: Option<String>,
        invoice_id: Option<String>,
        reasons: Vec<String>,
    ) -> Self {
        Self {
            matched: true,
            invoice_id,
            lease_id,
            confidence: confidence.min(100),
            method: Some(method),
            reasons,
        }
    }

    pub fn unmatched(reasons: Vec<String>) -> Self {
        Self {
            matched: false,
            invoice_id: None,
            lease_id: None,
            confidence: 0,
            method: None,
            reasons,
        }
    }
}
