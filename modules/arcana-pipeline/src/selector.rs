//! Unique topic selection over the combination space.
//!
//! Bounded random retry rather than exclusion-list sampling: the space is
//! thousands of combinations against single-digit daily consumption, so
//! collisions stay rare until near-exhaustion and the remaining set never
//! needs to be materialized per call.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use arcana_common::{PipelineError, Taxonomy, Topic};
use arcana_ledger::TopicLedger;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

pub struct TopicSelector {
    taxonomy: Taxonomy,
    rng: StdRng,
    max_attempts: u32,
}

impl TopicSelector {
    pub fn new(taxonomy: Taxonomy) -> Self {
        Self {
            taxonomy,
            rng: StdRng::from_os_rng(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Seeded selector for reproducible draw sequences.
    pub fn with_seed(taxonomy: Taxonomy, seed: u64) -> Self {
        Self {
            taxonomy,
            rng: StdRng::seed_from_u64(seed),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    fn draw(&mut self) -> Topic {
        let personality = self.taxonomy.personality_types
            [self.rng.random_range(0..self.taxonomy.personality_types.len())]
        .clone();
        let situation =
            self.taxonomy.situations[self.rng.random_range(0..self.taxonomy.situations.len())].clone();
        let card =
            self.taxonomy.cards[self.rng.random_range(0..self.taxonomy.cards.len())].clone();

        Topic {
            personality,
            situation,
            card,
        }
    }

    /// Draw uniformly until a topic with no published/scheduled entry
    /// turns up. Fails with `Exhausted` after the attempt budget, which
    /// signals the space is nearly saturated; the coordinator treats that
    /// as terminal rather than retrying.
    pub async fn select_unique(&mut self, ledger: &TopicLedger) -> Result<Topic, PipelineError> {
        if self.taxonomy.total_combinations() == 0 {
            return Err(PipelineError::Exhausted { attempts: 0 });
        }

        for attempt in 1..=self.max_attempts {
            let topic = self.draw();
            let used = ledger
                .exists(&topic)
                .await
                .map_err(|e| PipelineError::Storage(e.to_string()))?;

            if !used {
                info!(%topic, attempt, "Unique topic selected");
                return Ok(topic);
            }
            debug!(%topic, attempt, "Topic already consumed, redrawing");
        }

        warn!(
            max_attempts = self.max_attempts,
            "No unused combination found within the attempt budget"
        );
        Err(PipelineError::Exhausted {
            attempts: self.max_attempts,
        })
    }
}
