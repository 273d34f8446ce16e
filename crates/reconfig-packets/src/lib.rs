//! reconfig-packets — service-creation requests and responses.
//!
//! A [`CreateServiceName`] creates either one named service or a batch of
//! them. Large batches are cut into per-reconfigurator sub-batches with
//! the consistent-hash ring so that every owning group can commit its
//! share without coordinating with the others.
//!
//! # Components
//!
//! - **`create`** — the request/response type and its accessors
//! - **`batch`** — per-group splitting and size-bounded chunking
//! - **`wire`** — JSON encoding with the field keys reconfigurators expect

pub mod batch;
pub mod create;
pub mod error;
pub mod wire;

pub use batch::{groups_of, make_batches, make_group_batches};
pub use create::{CreateOutcome, CreateServiceName, NameStates};
pub use error::{PacketError, PacketResult};
