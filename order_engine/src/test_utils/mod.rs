//! Helpers for tests of the engine and of crates that build on it. Enabled by the `test_utils` feature.
mod prepare_env;
mod stubs;

pub use prepare_env::{prepare_test_env, random_db_path, signed_header};
pub use stubs::{RecordingNotifier, SentNotification, StubProvider};
