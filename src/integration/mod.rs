//! Integration test support
//!
//! `fixtures` holds scripted stand-ins for the browser-facing and network
//! seams; `e2e` drives the full router against them.

pub mod fixtures;

#[cfg(test)]
mod e2e;
