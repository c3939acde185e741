//! Fresh id generation for created and disambiguated nodes.

use rand::Rng;
use smol_str::format_smolstr;

use crate::document::Document;
use crate::node::NodeId;

/// Source of new node ids.
///
/// Generators only propose ids; [`IdGenerator::fresh`] checks proposals against the
/// document that will receive the node.
pub trait IdGenerator {
    /// Propose an id for a node of the given type.
    fn next_id(&mut self, prefix: &str) -> NodeId;

    /// Propose ids until one is free in `doc`.
    fn fresh(&mut self, doc: &Document, prefix: &str) -> NodeId {
        loop {
            let id = self.next_id(prefix);
            if !doc.contains(&id) {
                return id;
            }
        }
    }
}

/// Monotonic `{prefix}-{n}` ids.
#[derive(Debug, Clone, Default)]
pub struct SequentialIds {
    counter: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(counter: u64) -> Self {
        Self { counter }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self, prefix: &str) -> NodeId {
        self.counter += 1;
        format_smolstr!("{}-{}", prefix, self.counter)
    }
}

/// `{prefix}-{16 hex digits}` ids from the thread rng.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&mut self, prefix: &str) -> NodeId {
        let n: u64 = rand::rng().random();
        format_smolstr!("{}-{:016x}", prefix, n)
    }
}
