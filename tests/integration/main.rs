//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises one service through its
//! public API against mock hardware or a real loopback socket. All tests
//! run on the host with no device attached.

mod captive_dns_tests;
mod mock_hw;
mod rate_limit_tests;
mod status_engine_tests;
