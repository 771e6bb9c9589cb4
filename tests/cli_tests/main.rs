//! End to end tests of the `tessera` binary, run with `cargo test -- --ignored`.

mod help;
mod roundtrip;
mod utils;
