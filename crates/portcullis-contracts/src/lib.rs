//! # portcullis-contracts
//!
//! Shared types and error contracts for the portcullis admin authorization
//! runtime.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate — only data definitions and error types.

pub mod error;
pub mod identity;
pub mod policy;
pub mod session;
