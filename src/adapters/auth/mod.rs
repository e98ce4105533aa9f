//! Auth token providers.

mod token;

pub use token::{EnvTokenProvider, StaticTokenProvider};
