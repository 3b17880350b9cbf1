use std::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Several views of the subject, fused during sampling.
    MultiView,
    /// One canonical view of the subject.
    SingleView,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MultiView => "multi_view",
            Self::SingleView => "single_view",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialized Gaussian cloud produced by one strategy under one seed.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateResult {
    pub payload: Vec<u8>,
    pub seed: u32,
    pub strategy: Strategy,
}

/// The candidate returned to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ChampionResult {
    pub champion: CandidateResult,
    /// Index of the candidate that lost the duel, `None` when no duel ran.
    pub loser_index: Option<usize>,
    pub score: Option<f32>,
}

impl ChampionResult {
    /// Result for a pinned-seed request, where a single candidate ran unopposed.
    pub fn unopposed(champion: CandidateResult) -> Self {
        Self {
            champion,
            loser_index: None,
            score: None,
        }
    }

    pub fn seed(&self) -> u32 {
        self.champion.seed
    }

    pub fn strategy(&self) -> Strategy {
        self.champion.strategy
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.champion.payload
    }
}
