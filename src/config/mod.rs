//! Configuration model for inhibitor.
//!
//! The run-time directory root is injected through `Config` rather than
//! compiled in, so tests (and packagers) can point the lock directory at a
//! location of their choosing. Config files are YAML; unknown fields are
//! ignored for forward compatibility.

mod model;
mod operations;

#[cfg(test)]
mod tests;

pub use model::Config;
pub use model::INHIBIT_SUBDIR;
