//! Reef runtime core.
//!
//! Reef compiles to hosts whose only native numeric type is a 64-bit float
//! and whose objects carry no nominal type information. This crate is the
//! Rust reference model of the runtime support the code generator emits
//! for such hosts: the compiler's constant folder and the conformance
//! suite evaluate programs through it, so every algorithm here must
//! reproduce target results bit for bit.
//!
//! ## Modules
//!
//! - [`wideint`]: 64-bit signed integers emulated as two 32-bit words,
//!   with double-bounded fast paths for division and rendering
//! - [`typeinfo`]: per-type metadata records backing instance tests,
//!   subtype tests and covariant array typing
//! - [`value`]: the host value model (tagless primitives, tagged objects
//!   and arrays)
//! - [`identity`]: content hashes for host-represented values and lazy
//!   identity hashes for references
//! - [`error`]: the runtime's single arithmetic failure
//!
//! Everything is a pure, synchronous computation. The only shared mutable
//! state -- the array-shape memo slot and the identity-hash table -- is
//! populated at most once per key and guarded for multi-threaded hosts.

pub mod error;
pub mod identity;
pub mod typeinfo;
pub mod value;
pub mod wideint;

pub use error::ArithError;
pub use identity::{identity_hash, value_hash};
pub use typeinfo::{ArrayShape, InstanceTest, TypeInfo, TypeKey, TypeKind};
pub use value::{ArrayInstance, Instance, Value};
pub use wideint::WideInt;
