//! Test modules for webmentions
//!
//! Tests are organized by the module they test.

#[cfg(test)]
pub mod merge_tests;
