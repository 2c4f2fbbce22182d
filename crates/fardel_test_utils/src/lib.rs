//! Fixture harness for integration tests: an in-memory file tree plus a
//! JSON-style config mirroring the bundler options, so scenario tests read
//! like the option surface.

pub mod test_config;
pub mod tester;
