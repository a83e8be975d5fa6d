// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Instance id, assigned in first-seen order.
            pub fn get(self) -> u32 {
                self.0
            }

            pub(crate) fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

arena_id!(
    /// Handle to an [`InputSpec`](super::InputSpec) in the registry.
    InputId,
    "input"
);
arena_id!(
    /// Handle to a [`ModelSpec`](super::ModelSpec) in the registry.
    ModelId,
    "model"
);
arena_id!(
    /// Handle to an [`OutputSpec`](super::OutputSpec) in the registry.
    OutputId,
    "output"
);
