use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Marker for game-specific timed effect kinds. Lifetimes come from the
/// game's own tuning when an effect is scheduled.
pub trait EffectKind: Clone + Copy + PartialEq + std::fmt::Debug + Serialize + DeserializeOwned {}

/// A timed effect attached to an entity, generic over the kind enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ActiveEffect<K: EffectKind> {
    pub kind: K,
    /// Simulation time at which the effect ends, `None` if open-ended.
    pub expires_at_ms: Option<u64>,
}

impl<K: EffectKind> ActiveEffect<K> {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at_ms.is_some_and(|at| now_ms >= at)
    }
}

/// Per-entity list of active effects, at most one entry per kind.
///
/// Scheduling a kind that is already present replaces the old entry, which
/// is how a pending expiry gets cancelled and restarted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct EffectList<K: EffectKind> {
    effects: Vec<ActiveEffect<K>>,
}

impl<K: EffectKind> Default for EffectList<K> {
    fn default() -> Self {
        Self {
            effects: Vec::new(),
        }
    }
}

impl<K: EffectKind> EffectList<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `kind` with an explicit expiry, replacing any existing entry.
    pub fn schedule(&mut self, kind: K, expires_at_ms: Option<u64>) {
        self.effects.retain(|e| e.kind != kind);
        self.effects.push(ActiveEffect {
            kind,
            expires_at_ms,
        });
    }

    /// Remove `kind`. Returns whether it was present.
    pub fn cancel(&mut self, kind: K) -> bool {
        let before = self.effects.len();
        self.effects.retain(|e| e.kind != kind);
        before != self.effects.len()
    }

    pub fn contains(&self, kind: K) -> bool {
        self.effects.iter().any(|e| e.kind == kind)
    }

    pub fn get(&self, kind: K) -> Option<&ActiveEffect<K>> {
        self.effects.iter().find(|e| e.kind == kind)
    }

    /// Remove and return every effect that has expired by `now_ms`,
    /// in the order they were scheduled.
    pub fn drain_expired(&mut self, now_ms: u64) -> Vec<K> {
        let mut expired = Vec::new();
        self.effects.retain(|e| {
            if e.is_expired(now_ms) {
                expired.push(e.kind);
                false
            } else {
                true
            }
        });
        expired
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveEffect<K>> {
        self.effects.iter()
    }
}
