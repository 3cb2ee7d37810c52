use crate::{
    domain::{Target, TargetId},
    Error, Result,
};

/// In-memory set of delivery targets, deduplicated by id and kept in
/// insertion order.
///
/// The registry is plain data: the scheduler owns it behind its own lock and
/// drives persistence through the [`crate::ports::TargetStore`] port.
#[derive(Clone, Debug, Default)]
pub struct TargetRegistry {
    targets: Vec<Target>,
}

impl TargetRegistry {
    /// Build from a loaded list, dropping any duplicate ids while keeping the
    /// first occurrence (a hand-edited file may contain repeats).
    pub fn from_targets(loaded: Vec<Target>) -> Self {
        let mut registry = Self::default();
        for target in loaded {
            let _ = registry.add(target);
        }
        registry
    }

    pub fn add(&mut self, target: Target) -> Result<()> {
        if self.targets.iter().any(|t| t.id == target.id) {
            return Err(Error::DuplicateTarget(target.title));
        }
        self.targets.push(target);
        Ok(())
    }

    /// Remove the first target whose title equals `matcher`. Falls back to an
    /// id match when the matcher parses as a number and no title matched.
    pub fn remove(&mut self, matcher: &str) -> Result<Target> {
        let by_id = matcher.trim().parse::<i64>().ok().map(TargetId);

        let pos = self
            .targets
            .iter()
            .position(|t| t.title == matcher)
            .or_else(|| by_id.and_then(|id| self.targets.iter().position(|t| t.id == id)))
            .ok_or_else(|| Error::TargetNotFound(matcher.to_string()))?;

        Ok(self.targets.remove(pos))
    }

    /// Snapshot of all targets; safe to iterate while the registry is later
    /// mutated.
    pub fn list(&self) -> Vec<Target> {
        self.targets.clone()
    }

    pub fn count(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
