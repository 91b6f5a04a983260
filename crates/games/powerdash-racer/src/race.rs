use serde::{Deserialize, Serialize};

use powerdash_core::game_trait::{EntityId, Standing};

/// A racer that crossed the line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finisher {
    pub racer: EntityId,
    pub name: String,
    /// 1-based rank in arrival order.
    pub position: usize,
    pub timestamp_ms: u64,
}

/// On-screen "1st!" style notice for a finisher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Callout {
    pub racer: EntityId,
    pub rank: usize,
    pub expires_at_ms: u64,
}

/// Final result handed to the results screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceSummary {
    pub finishers: Vec<Finisher>,
    pub total_racers: usize,
}

/// Where a racer currently is, for ranking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub racer: EntityId,
    pub x: f64,
}

/// Finish bookkeeping: ranks, callouts and the end-of-race condition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RaceOrchestrator {
    finishers: Vec<Finisher>,
    callouts: Vec<Callout>,
    podium_size: usize,
    total_racers: usize,
    ended: bool,
}

impl RaceOrchestrator {
    pub fn new(podium_size: usize, total_racers: usize) -> Self {
        Self {
            podium_size,
            total_racers,
            ..Self::default()
        }
    }

    /// Finishers needed to end the race. Short fields end once everyone is in.
    pub fn target(&self) -> usize {
        self.podium_size.min(self.total_racers).max(1)
    }

    /// Record a crossing. Returns the assigned rank, or `None` if the racer
    /// already finished or the race is over.
    pub fn record_finish(
        &mut self,
        racer: EntityId,
        name: &str,
        now_ms: u64,
        callout_ms: u64,
    ) -> Option<usize> {
        if self.ended || self.has_finished(racer) {
            return None;
        }
        let position = self.finishers.len() + 1;
        self.finishers.push(Finisher {
            racer,
            name: name.to_string(),
            position,
            timestamp_ms: now_ms,
        });
        self.callouts.push(Callout {
            racer,
            rank: position,
            expires_at_ms: now_ms + callout_ms,
        });
        tracing::info!(racer, name, position, now_ms, "Racer finished");
        if self.finishers.len() >= self.target() {
            self.ended = true;
        }
        Some(position)
    }

    pub fn has_finished(&self, racer: EntityId) -> bool {
        self.finishers.iter().any(|f| f.racer == racer)
    }

    pub fn rank_of(&self, racer: EntityId) -> Option<usize> {
        self.finishers
            .iter()
            .find(|f| f.racer == racer)
            .map(|f| f.position)
    }

    /// Remove callouts whose time is up, returning whose they were.
    pub fn expire_callouts(&mut self, now_ms: u64) -> Vec<EntityId> {
        let mut expired = Vec::new();
        self.callouts.retain(|c| {
            if c.expires_at_ms <= now_ms {
                expired.push(c.racer);
                false
            } else {
                true
            }
        });
        expired
    }

    pub fn callouts(&self) -> &[Callout] {
        &self.callouts
    }

    pub fn finishers(&self) -> &[Finisher] {
        &self.finishers
    }

    pub fn is_over(&self) -> bool {
        self.ended
    }

    /// A racer left mid-race. Recorded finishes stay; the field shrinks.
    pub fn racer_left(&mut self, racer: EntityId) {
        self.callouts.retain(|c| c.racer != racer);
        self.total_racers = self.total_racers.saturating_sub(1);
        if !self.ended && self.finishers.len() >= self.target() {
            self.ended = true;
        }
    }

    /// Finished racers by rank, then everyone else by distance, ties by id.
    pub fn standings(&self, field: &[Progress]) -> Vec<Standing> {
        let mut rows: Vec<(Option<usize>, Progress)> =
            field.iter().map(|p| (self.rank_of(p.racer), *p)).collect();
        rows.sort_by(|(ra, a), (rb, b)| match (ra, rb) {
            (Some(ra), Some(rb)) => ra.cmp(rb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => b.x.total_cmp(&a.x).then(a.racer.cmp(&b.racer)),
        });
        rows.into_iter()
            .enumerate()
            .map(|(i, (rank, p))| Standing {
                racer_id: p.racer,
                place: i + 1,
                x: p.x,
                finished: rank.is_some(),
            })
            .collect()
    }

    pub fn summary(&self) -> RaceSummary {
        RaceSummary {
            finishers: self.finishers.clone(),
            total_racers: self.total_racers,
        }
    }
}
