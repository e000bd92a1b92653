use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity tiers, ordered so that comparisons read naturally:
/// `Blocker > High > Med > Low > Nit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Nit,
    Low,
    Med,
    High,
    Blocker,
}

impl Severity {
    /// All tiers, highest first (report rendering order).
    pub const ALL: [Severity; 5] = [
        Severity::Blocker,
        Severity::High,
        Severity::Med,
        Severity::Low,
        Severity::Nit,
    ];

    pub fn parse(s: &str) -> Option<Severity> {
        match s.to_ascii_lowercase().as_str() {
            "blocker" => Some(Severity::Blocker),
            "high" => Some(Severity::High),
            "med" | "medium" => Some(Severity::Med),
            "low" => Some(Severity::Low),
            "nit" => Some(Severity::Nit),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Blocker => "BLOCKER",
            Severity::High => "HIGH",
            Severity::Med => "MED",
            Severity::Low => "LOW",
            Severity::Nit => "NIT",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Med,
    High,
}

impl Confidence {
    /// One-step downgrade for heuristic matches. Already-Low stays Low.
    pub fn downgraded(self) -> Confidence {
        match self {
            Confidence::High => Confidence::Med,
            Confidence::Med | Confidence::Low => Confidence::Low,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Confidence::High => "HIGH",
            Confidence::Med => "MED",
            Confidence::Low => "LOW",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeRecommendation {
    Approve,
    ApproveWithComments,
    RequestChanges,
    Block,
}

impl fmt::Display for MergeRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MergeRecommendation::Approve => "APPROVE",
            MergeRecommendation::ApproveWithComments => "APPROVE_WITH_COMMENTS",
            MergeRecommendation::RequestChanges => "REQUEST_CHANGES",
            MergeRecommendation::Block => "BLOCK",
        };
        write!(f, "{label}")
    }
}
