//! Formatted diagnostics on stderr: message, `file:line:column` excerpt
//! with a caret, colorized when attached to a terminal.

use ansi_term::Color;
use fardel_error::{Error, Errors};

pub fn report_error(error: &Error, color: bool) {
  let label = if color {
    Color::Red.bold().paint("error:").to_string()
  } else {
    "error:".to_string()
  };
  eprintln!("{label} {error}");
  if let Some(location) = error.kind.location() {
    eprintln!("{}", location.render());
  }
}

pub fn report_errors(errors: &Errors, error_limit: usize, color: bool) {
  let list = errors.as_slice();
  let shown = list.len().min(error_limit.max(1));
  for error in &list[..shown] {
    report_error(error, color);
  }
  if list.len() > shown {
    eprintln!("{} more errors", list.len() - shown);
  }
}

pub fn summarize_written(files: &[(String, usize)]) {
  let width = files
    .iter()
    .map(|(name, _)| name.len())
    .max()
    .unwrap_or(0);
  for (name, bytes) in files {
    println!("  {name:<width$}  {}", human_size(*bytes));
  }
}

fn human_size(bytes: usize) -> String {
  if bytes >= 1024 * 1024 {
    format!("{:.1}mb", bytes as f64 / (1024.0 * 1024.0))
  } else if bytes >= 1024 {
    format!("{:.1}kb", bytes as f64 / 1024.0)
  } else {
    format!("{bytes}b")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sizes_are_humanized() {
    assert_eq!(human_size(12), "12b");
    assert_eq!(human_size(2048), "2.0kb");
    assert_eq!(human_size(3 * 1024 * 1024), "3.0mb");
  }
}
