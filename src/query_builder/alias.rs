//! Table alias allocation.
//!
//! Every compile call owns its own allocator, so concurrent compilations can
//! never produce colliding aliases and never contend on shared state. The
//! deterministic mode yields `t0`, `t1`, ... in allocation order, which keeps
//! generated SQL reproducible for golden tests; the random mode trades that
//! for aliases that are unique across queries, useful when stitching compiled
//! fragments together downstream.

use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AliasMode {
    #[default]
    Deterministic,
    Random,
}

#[derive(Debug)]
pub struct AliasAllocator {
    mode: AliasMode,
    counter: usize,
}

impl AliasAllocator {
    pub fn new(mode: AliasMode) -> Self {
        AliasAllocator { mode, counter: 0 }
    }

    pub fn next(&mut self) -> String {
        match self.mode {
            AliasMode::Deterministic => {
                let alias = format!("t{}", self.counter);
                self.counter += 1;
                alias
            }
            AliasMode::Random => {
                let id = Uuid::new_v4().simple().to_string();
                format!("t_{}", &id[..12])
            }
        }
    }
}
