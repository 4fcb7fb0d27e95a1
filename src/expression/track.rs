//! This module contains the bookkeeping that data-flow passes use alongside
//! [`Track`](crate::expression::Expression::Track) expressions: a record of
//! which address last defined each register.

use std::collections::HashMap;

use crate::{address::Address, arch::RegisterId};

/// The per-pass record of where each register was last defined.
#[derive(Clone, Debug, Default)]
pub struct Context {
    tracked: HashMap<RegisterId, Address>,
}

impl Context {
    /// Constructs an empty tracking context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that the register `id` was defined at `address`, replacing
    /// any earlier definition site.
    pub fn track_id(&mut self, id: RegisterId, address: Address) {
        self.tracked.insert(id, address);
    }

    /// Gets the address that last defined the register `id`, if it has been
    /// tracked.
    #[must_use]
    pub fn address_of(&self, id: RegisterId) -> Option<Address> {
        self.tracked.get(&id).copied()
    }
}
