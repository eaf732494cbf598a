//! Database tool functions invoked from agent reasoning.
//!
//! Every tool follows the same boundary contract: get tools never error (all
//! failures come back as structured results with `success: false`), single
//! inserts return the new id or `None`, updates return whether a row was
//! touched, and batch operations validate every item before any SQL is built
//! so a malformed batch writes nothing.

pub mod analysis;
pub mod components;
pub mod dispatch;
pub mod evaluations;
pub mod experiments;
pub mod hypotheses;
pub mod insights;
pub mod views;

pub use dispatch::{dispatch_tool, ToolContext};
