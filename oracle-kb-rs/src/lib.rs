 // oracle-kb-rs/src/lib.rs
 // Library interface for the Oracle knowledge base.
 //
 // The knowledge base stores every observed mission failure alongside the
 // remediation patterns that have worked (or not worked) for it before,
 // and keeps a per-pattern confidence score that is reinforced by observed
 // outcomes.
 //
 // Design notes:
 // - This crate is a pure library crate; there is no HTTP server or
 //   standalone binary entrypoint. The auto-fix layer (autofix-rs) is the
 //   intended consumer.
 // - All persistence goes through the narrow `PatternStore` trait so the
 //   file-backed document store can be swapped for an embedded database
 //   later without touching callers.

pub mod model;
pub mod reinforcement;
pub mod store;

#[cfg(test)]
mod tests;
