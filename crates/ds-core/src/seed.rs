use std::ops::Range;
use rand::Rng;
use rand::rngs::OsRng;
use crate::error::{Error, Result};

/// Seeds for duel strategies are drawn from this range.
pub const SEED_RANGE: Range<u32> = 0..10_000;

/// Raw seed value that asks for a duel with automatically drawn seeds.
pub const AUTO_SEED: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seed {
    Auto,
    Fixed(u32),
}

impl Seed {
    pub fn from_raw(raw: i64) -> Result<Self> {
        match raw {
            AUTO_SEED => Ok(Self::Auto),
            raw if raw < 0 => Err(Error::InvalidRequest(format!(
                "seed must be non-negative or {AUTO_SEED}, got {raw}"
            ))),
            raw => u32::try_from(raw)
                .map(Self::Fixed)
                .map_err(|_| Error::InvalidRequest(format!("seed {raw} does not fit in 32 bits"))),
        }
    }
}

pub trait SeedSource: Send + Sync {
    fn draw(&self, range: Range<u32>) -> u32;
}

/// Draws from the operating system's CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSeedSource;

impl SeedSource for OsSeedSource {
    fn draw(&self, range: Range<u32>) -> u32 {
        OsRng.gen_range(range)
    }
}

/// Two distinct seeds, the second re-drawn until it differs from the first.
pub fn draw_seed_pair(source: &dyn SeedSource) -> (u32, u32) {
    let first = source.draw(SEED_RANGE);
    let mut second = source.draw(SEED_RANGE);
    while second == first {
        second = source.draw(SEED_RANGE);
    }
    (first, second)
}
