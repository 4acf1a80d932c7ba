//! prefcase library exports for the CLI and integration tests

pub mod app;
pub mod core;
pub mod prefs;

#[cfg(test)]
pub mod test_support;
