use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A statement export format produced by one institution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    Mpesa,
    Kcb,
    Equity,
    Coop,
    Ncba,
    Generic,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown statement dialect: '{0}'")]
pub struct UnknownDialect(pub String);

impl Dialect {
    pub const ALL: [Dialect; 6] = [
        Dialect::Mpesa,
        Dialect::Kcb,
        Dialect::Equity,
        Dialect::Coop,
        Dialect::Ncba,
        Dialect::Generic,
    ];

    /// Stable identifier, also used as the payment provider key.
    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Mpesa => "mpesa",
            Dialect::Kcb => "kcb",
            Dialect::Equity => "equity",
            Dialect::Coop => "coop",
            Dialect::Ncba => "ncba",
            Dialect::Generic => "generic",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Dialect::Mpesa => "M-PESA",
            Dialect::Kcb => "KCB Bank",
            Dialect::Equity => "Equity Bank",
            Dialect::Coop => "Co-operative Bank",
            Dialect::Ncba => "NCBA Bank",
            Dialect::Generic => "Generic CSV",
        }
    }

    /// Comma-separated list of the identifiers, for error hints.
    pub fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(|d| d.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mpesa" | "m-pesa" => Ok(Dialect::Mpesa),
            "kcb" => Ok(Dialect::Kcb),
            "equity" => Ok(Dialect::Equity),
            "coop" | "co-op" | "cooperative" => Ok(Dialect::Coop),
            "ncba" => Ok(Dialect::Ncba),
            "generic" => Ok(Dialect::Generic),
            _ => Err(UnknownDialect(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn roundtrip_through_as_str() {
        for d in Dialect::ALL {
            assert_eq!(Dialect::from_str(d.as_str()).unwrap(), d);
        }
    }

    #[test]
    fn aliases_accepted() {
        assert_eq!(Dialect::from_str("M-PESA").unwrap(), Dialect::Mpesa);
        assert_eq!(Dialect::from_str("Co-op").unwrap(), Dialect::Coop);
    }

    #[test]
    fn unknown_rejected() {
        assert_eq!(
            Dialect::from_str("barclays"),
            Err(UnknownDialect("barclays".to_string()))
        );
    }
}
