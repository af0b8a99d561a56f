//! Wiring helpers shared by the `context` binary and its integration tests.
//! The command-line front end is out of scope (spec.md §1); this crate
//! exists to assemble the library crates into a runnable demonstration, not
//! to grow a feature surface of its own.

pub mod pipeline;
