use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Policy knobs
// ---------------------------------------------------------------------------

/// What a merge does with incoming records whose key is not in the prior
/// document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedIncoming {
    /// Discard them. Historical behavior: a material that first appears in
    /// a resubmission never reaches the stored document.
    #[default]
    Drop,
    /// Append them after the prior records, unannotated, in upload order.
    Append,
}

/// How a percentage is rendered when the old value is zero or missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroBaseline {
    /// `"0.00"`, indistinguishable from "no change".
    #[default]
    Zero,
    /// `"new"` when the new value is non-zero.
    New,
}

/// Reconciliation policy, read from the `[recon]` table of the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconPolicy {
    pub unmatched_incoming: UnmatchedIncoming,
    pub zero_baseline: ZeroBaseline,
}

impl ReconPolicy {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        toml::from_str(input).map_err(|e| ReconError::Policy(e.to_string()))
    }
}

impl std::fmt::Display for UnmatchedIncoming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Drop => write!(f, "drop"),
            Self::Append => write!(f, "append"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_preserve_historical_behavior() {
        let policy = ReconPolicy::from_toml("").unwrap();
        assert_eq!(policy.unmatched_incoming, UnmatchedIncoming::Drop);
        assert_eq!(policy.zero_baseline, ZeroBaseline::Zero);
    }

    #[test]
    fn parse_overrides() {
        let policy = ReconPolicy::from_toml(
            r#"
unmatched_incoming = "append"
zero_baseline = "new"
"#,
        )
        .unwrap();
        assert_eq!(policy.unmatched_incoming, UnmatchedIncoming::Append);
        assert_eq!(policy.zero_baseline, ZeroBaseline::New);
    }

    #[test]
    fn unknown_value_rejected() {
        let err = ReconPolicy::from_toml(r#"unmatched_incoming = "keep""#).unwrap_err();
        assert!(matches!(err, ReconError::Policy(_)));
        assert!(err.to_string().contains("policy config error"));
    }
}
