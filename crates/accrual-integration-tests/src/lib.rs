//! Integration test crate for the accrual ledger.
//!
//! This crate has no library code; it only contains integration tests
//! that exercise full vault lifecycles across the workspace crates.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p accrual-integration-tests
//! ```
