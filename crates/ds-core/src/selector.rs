use std::sync::Arc;
use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};
use crate::candidate::{CandidateResult, ChampionResult};
use crate::error::{BoxError, Error, Result};

/// Outcome of comparing two candidates against the reference image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub winner: usize,
    #[serde(default)]
    pub score: Option<f32>,
}

/// Compares two generated payloads against the image they were generated from.
#[async_trait]
pub trait Judge: Send + Sync {
    async fn judge(
        &self,
        reference: &[u8],
        candidate_a: &[u8],
        candidate_b: &[u8],
    ) -> std::result::Result<Verdict, BoxError>;
}

pub struct ChampionSelector {
    judge: Arc<dyn Judge>,
}

impl ChampionSelector {
    pub fn new(judge: Arc<dyn Judge>) -> Self {
        Self { judge }
    }

    /// Pick the winner of `candidates`. The judge must name index 0 or 1; there is no
    /// fallback winner when it fails or answers anything else.
    pub async fn select(
        &self,
        reference: &[u8],
        candidates: [CandidateResult; 2],
    ) -> Result<ChampionResult> {
        let verdict = self
            .judge
            .judge(reference, &candidates[0].payload, &candidates[1].payload)
            .await
            .map_err(Error::Selection)?;

        let [first, second] = candidates;
        let (champion, loser_index) = match verdict.winner {
            0 => (first, 1),
            1 => (second, 0),
            other => {
                return Err(Error::Selection(
                    format!("judge returned winner index {other}, expected 0 or 1").into(),
                ));
            }
        };

        info!(
            "Champion: {} (seed={}, score={:?})",
            champion.strategy, champion.seed, verdict.score
        );

        Ok(ChampionResult {
            champion,
            loser_index: Some(loser_index),
            score: verdict.score,
        })
    }
}
