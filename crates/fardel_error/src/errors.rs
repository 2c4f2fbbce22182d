use std::fmt::Display;

use crate::Error;

/// Everything that went wrong in one build. The pipeline keeps collecting
/// per-file diagnostics up to the caller's error limit before giving up, so
/// failures carry more than the first hit.
#[derive(Debug)]
pub struct Errors {
  errors: Vec<Error>,
}

impl Errors {
  pub fn from_vec(errors: Vec<Error>) -> Self {
    debug_assert!(!errors.is_empty());
    Self { errors }
  }

  pub fn as_slice(&self) -> &[Error] {
    &self.errors
  }

  pub fn into_vec(self) -> Vec<Error> {
    self.errors
  }

  pub fn len(&self) -> usize {
    self.errors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.errors.is_empty()
  }
}

impl From<Error> for Errors {
  fn from(error: Error) -> Self {
    Self {
      errors: vec![error],
    }
  }
}

impl Display for Errors {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    for (i, error) in self.errors.iter().enumerate() {
      if i > 0 {
        writeln!(f)?;
      }
      error.fmt(f)?;
    }
    Ok(())
  }
}

impl std::error::Error for Errors {}
