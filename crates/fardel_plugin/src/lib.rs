mod plugin;
pub use plugin::*;
mod args;
pub use args::*;

/// Per-invocation context handed to plugin hooks. Empty for now; it exists
/// so hooks can gain capabilities without breaking the trait.
#[derive(Debug, Default)]
pub struct Context {}

impl Context {
  pub fn new() -> Self {
    Self::default()
  }
}
