//! Shared plumbing for the `translator` and `machine` binaries: input
//! schedule parsing and binary-image loading. Kept as a library crate
//! so both binaries (and their integration tests) can reuse it without
//! duplicating parsing logic — mirrors the teacher's `vex`/`vasm` split
//! between a thin `main.rs` and a testable `lib.rs`.

pub mod loader;
pub mod schedule;
