//! reconfig-partition — which reconfigurators own which service names.
//!
//! Names are placed on a consistent-hash ring of reconfigurator tokens.
//! The owner of a name commits its records; the next distinct nodes on
//! the ring form its RC group. Because only the tokens of the node that
//! joins or leaves change, membership changes move only the names that
//! node gains or loses.
//!
//! # Components
//!
//! - **`ring`** — token ring, owner and RC-group lookup, batch splitting

pub mod error;
pub mod ring;

pub use error::{PartitionError, PartitionResult};
pub use ring::{ConsistentHashRing, owner, split_into_groups};
