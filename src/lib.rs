//! Tackle is a fluent data access toolkit: declarative command builders are
//! turned into dialect-correct parameterized SQL, dispatched through an
//! [`Executor`], and read back into typed objects, collections, scalars or
//! tables by the materializer layer.
//!
//! This crate is a facade over `tackle-core`, which holds the whole
//! implementation. Backend transports implement [`Executor`] and are
//! distributed separately.

pub use tackle_core::*;
