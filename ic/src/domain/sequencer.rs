//! Transformation sequencer
//!
//! Owns the ordered list of applied descriptors and the undo stack of full
//! snapshots. Snapshot `i` is the sequence right after the `i`-th successful
//! append; undo pops the top and falls back to the snapshot below it.

use tracing::debug;

use super::descriptor::{Descriptor, DescriptorGroup};

/// Ordered transformation list with snapshot-based undo
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sequencer {
    sequence: Vec<Descriptor>,
    history: Vec<Vec<Descriptor>>,
    max_depth: Option<usize>,
    /// State under the oldest retained snapshot, once older ones were evicted
    floor: Vec<Descriptor>,
}

impl Sequencer {
    /// Create an empty sequencer; `max_depth` caps retained snapshots
    pub fn new(max_depth: Option<usize>) -> Self {
        debug!(?max_depth, "Sequencer::new: called");
        Self {
            max_depth: max_depth.filter(|d| *d > 0),
            ..Default::default()
        }
    }

    /// Rehydrate from persisted state, replacing whatever is held
    ///
    /// `floor` is the state under the oldest snapshot, as reported by
    /// [`Sequencer::floor`] when the state was saved.
    pub fn restore(&mut self, sequence: Vec<Descriptor>, history: Vec<Vec<Descriptor>>, floor: Vec<Descriptor>) {
        debug!(
            sequence_len = sequence.len(),
            history_len = history.len(),
            floor_len = floor.len(),
            "Sequencer::restore: called"
        );
        self.sequence = sequence;
        self.history = history;
        self.floor = floor;
        self.enforce_depth();
    }

    /// Append one turn's output
    ///
    /// Returns the new sequence, or `None` when the group normalizes to no
    /// steps (nothing changes and no snapshot is pushed).
    pub fn append(&mut self, group: impl Into<DescriptorGroup>) -> Option<&[Descriptor]> {
        let steps = group.into().into_steps();
        debug!(step_count = steps.len(), "Sequencer::append: called");
        if steps.is_empty() {
            debug!("Sequencer::append: empty group, no-op");
            return None;
        }

        self.sequence.extend(steps);
        self.history.push(self.sequence.clone());
        self.enforce_depth();
        Some(&self.sequence)
    }

    /// Revert the most recent append
    ///
    /// Returns the restored sequence, or `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<&[Descriptor]> {
        debug!(depth = self.history.len(), "Sequencer::undo: called");
        self.history.pop()?;
        self.sequence = match self.history.last() {
            Some(previous) => previous.clone(),
            None => std::mem::take(&mut self.floor),
        };
        Some(&self.sequence)
    }

    /// Drop everything (the active image changed)
    pub fn reset(&mut self) {
        debug!("Sequencer::reset: called");
        self.sequence.clear();
        self.history.clear();
        self.floor.clear();
    }

    /// The live sequence
    pub fn current(&self) -> &[Descriptor] {
        &self.sequence
    }

    /// Undo snapshots, oldest first
    pub fn history(&self) -> &[Vec<Descriptor>] {
        &self.history
    }

    /// What undoing the oldest retained snapshot falls back to
    pub fn floor(&self) -> &[Descriptor] {
        &self.floor
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    fn enforce_depth(&mut self) {
        let Some(max) = self.max_depth else {
            return;
        };
        while self.history.len() > max {
            debug!(max, "Sequencer::enforce_depth: evicting oldest snapshot");
            self.floor = self.history.remove(0);
        }
    }
}
