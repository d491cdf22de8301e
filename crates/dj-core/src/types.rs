//! Common data types for dijetplot

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a sample in a comparison plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleKind {
    /// Recorded (or pseudo-) data.
    Data,
    /// Simulated background, stackable.
    #[serde(rename = "bkg", alias = "background")]
    Background,
    /// Simulated signal hypothesis.
    Signal,
}

impl SampleKind {
    /// Short label used in artifacts and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleKind::Data => "data",
            SampleKind::Background => "bkg",
            SampleKind::Signal => "signal",
        }
    }
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SampleKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "data" => Ok(SampleKind::Data),
            "bkg" | "background" => Ok(SampleKind::Background),
            "signal" | "sig" => Ok(SampleKind::Signal),
            other => Err(crate::Error::Validation(format!("unknown sample kind: '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_kind_parse() {
        assert_eq!("data".parse::<SampleKind>().unwrap(), SampleKind::Data);
        assert_eq!("BKG".parse::<SampleKind>().unwrap(), SampleKind::Background);
        assert_eq!("signal".parse::<SampleKind>().unwrap(), SampleKind::Signal);
        assert!("stack".parse::<SampleKind>().is_err());
    }

    #[test]
    fn test_sample_kind_serde() {
        let k: SampleKind = serde_json::from_str("\"bkg\"").unwrap();
        assert_eq!(k, SampleKind::Background);
        assert_eq!(serde_json::to_string(&SampleKind::Data).unwrap(), "\"data\"");
    }
}
