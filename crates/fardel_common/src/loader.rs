use std::str::FromStr;

/// How raw bytes become a module. Everything funnels into JavaScript before
/// parsing; non-code loaders synthesize a default-export module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loader {
  Js,
  Jsx,
  Ts,
  Tsx,
  Json,
  Css,
  Text,
  Base64,
  DataUrl,
  Binary,
  File,
}

impl Loader {
  pub fn by_extension(ext: &str) -> Option<Self> {
    match ext {
      "js" | "mjs" | "cjs" => Some(Self::Js),
      "jsx" => Some(Self::Jsx),
      "ts" | "mts" | "cts" => Some(Self::Ts),
      "tsx" => Some(Self::Tsx),
      "json" => Some(Self::Json),
      "css" => Some(Self::Css),
      "txt" => Some(Self::Text),
      _ => None,
    }
  }

  pub fn is_code(self) -> bool {
    matches!(self, Self::Js | Self::Jsx | Self::Ts | Self::Tsx)
  }
}

impl FromStr for Loader {
  type Err = fardel_error::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "js" => Ok(Self::Js),
      "jsx" => Ok(Self::Jsx),
      "ts" => Ok(Self::Ts),
      "tsx" => Ok(Self::Tsx),
      "json" => Ok(Self::Json),
      "css" => Ok(Self::Css),
      "text" => Ok(Self::Text),
      "base64" => Ok(Self::Base64),
      "data-url" | "dataurl" => Ok(Self::DataUrl),
      "binary" => Ok(Self::Binary),
      "file" => Ok(Self::File),
      _ => Err(fardel_error::Error::panic(format!(
        "Unknown loader value \"{s}\""
      ))),
    }
  }
}
