//! Source-map v3 builder. The printer feeds `(generated, original)` pairs in
//! emission order; this crate delta-encodes them into the VLQ `mappings`
//! string and serializes the JSON object.

use serde::Serialize;

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn encode_vlq(out: &mut String, value: i64) {
  let mut vlq = if value < 0 {
    ((-value as u64) << 1) | 1
  } else {
    (value as u64) << 1
  };
  loop {
    let mut digit = (vlq & 0b11111) as usize;
    vlq >>= 5;
    if vlq != 0 {
      digit |= 0b100000;
    }
    out.push(BASE64[digit] as char);
    if vlq == 0 {
      break;
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
  pub generated_line: u32,
  pub generated_col: u32,
  pub source: u32,
  pub original_line: u32,
  pub original_col: u32,
  pub name: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SourceMap {
  pub version: u8,
  pub sources: Vec<String>,
  #[serde(rename = "sourcesContent", skip_serializing_if = "Option::is_none")]
  pub sources_content: Option<Vec<Option<String>>>,
  pub names: Vec<String>,
  pub mappings: String,
}

impl SourceMap {
  pub fn to_json(&self) -> String {
    serde_json::to_string(self).expect("source map serialization cannot fail")
  }

  pub fn to_data_url(&self) -> String {
    format!(
      "data:application/json;base64,{}",
      base64_encode(self.to_json().as_bytes())
    )
  }
}

pub fn base64_encode(bytes: &[u8]) -> String {
  let mut out = String::with_capacity((bytes.len() + 2) / 3 * 4);
  for chunk in bytes.chunks(3) {
    let b = [
      chunk[0],
      chunk.get(1).copied().unwrap_or(0),
      chunk.get(2).copied().unwrap_or(0),
    ];
    out.push(BASE64[(b[0] >> 2) as usize] as char);
    out.push(BASE64[(((b[0] & 0b11) << 4) | (b[1] >> 4)) as usize] as char);
    if chunk.len() > 1 {
      out.push(BASE64[(((b[1] & 0b1111) << 2) | (b[2] >> 6)) as usize] as char);
    } else {
      out.push('=');
    }
    if chunk.len() > 2 {
      out.push(BASE64[(b[2] & 0b111111) as usize] as char);
    } else {
      out.push('=');
    }
  }
  out
}

#[derive(Debug, Default)]
pub struct SourceMapBuilder {
  sources: Vec<String>,
  sources_content: Vec<Option<String>>,
  names: Vec<String>,
  mappings: Vec<Mapping>,
  include_sources_content: bool,
}

impl SourceMapBuilder {
  pub fn new(include_sources_content: bool) -> Self {
    Self {
      include_sources_content,
      ..Default::default()
    }
  }

  pub fn add_source(&mut self, path: impl Into<String>, content: Option<String>) -> u32 {
    self.sources.push(path.into());
    self.sources_content.push(content);
    (self.sources.len() - 1) as u32
  }

  pub fn add_name(&mut self, name: impl Into<String>) -> u32 {
    let name = name.into();
    if let Some(found) = self.names.iter().position(|n| n == &name) {
      return found as u32;
    }
    self.names.push(name);
    (self.names.len() - 1) as u32
  }

  pub fn add_mapping(&mut self, mapping: Mapping) {
    self.mappings.push(mapping);
  }

  pub fn is_empty(&self) -> bool {
    self.mappings.is_empty()
  }

  pub fn build(mut self) -> SourceMap {
    self
      .mappings
      .sort_by_key(|m| (m.generated_line, m.generated_col));

    let mut mappings = String::new();
    let mut current_line = 0u32;
    let mut prev_col = 0i64;
    let mut prev_source = 0i64;
    let mut prev_orig_line = 0i64;
    let mut prev_orig_col = 0i64;
    let mut prev_name = 0i64;
    let mut first_on_line = true;

    for m in &self.mappings {
      while current_line < m.generated_line {
        mappings.push(';');
        current_line += 1;
        prev_col = 0;
        first_on_line = true;
      }
      if !first_on_line {
        mappings.push(',');
      }
      first_on_line = false;
      encode_vlq(&mut mappings, m.generated_col as i64 - prev_col);
      prev_col = m.generated_col as i64;
      encode_vlq(&mut mappings, m.source as i64 - prev_source);
      prev_source = m.source as i64;
      encode_vlq(&mut mappings, m.original_line as i64 - prev_orig_line);
      prev_orig_line = m.original_line as i64;
      encode_vlq(&mut mappings, m.original_col as i64 - prev_orig_col);
      prev_orig_col = m.original_col as i64;
      if let Some(name) = m.name {
        encode_vlq(&mut mappings, name as i64 - prev_name);
        prev_name = name as i64;
      }
    }

    SourceMap {
      version: 3,
      sources: self.sources,
      sources_content: self
        .include_sources_content
        .then_some(self.sources_content),
      names: self.names,
      mappings,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn vlq_encodes_known_values() {
    let mut out = String::new();
    encode_vlq(&mut out, 0);
    assert_eq!(out, "A");
    out.clear();
    encode_vlq(&mut out, 16);
    assert_eq!(out, "gB");
    out.clear();
    encode_vlq(&mut out, -1);
    assert_eq!(out, "D");
  }

  #[test]
  fn first_segment_is_absolute() {
    let mut builder = SourceMapBuilder::new(false);
    builder.add_source("/a.js", None);
    builder.add_mapping(Mapping {
      generated_line: 0,
      generated_col: 0,
      source: 0,
      original_line: 0,
      original_col: 0,
      name: None,
    });
    let map = builder.build();
    assert_eq!(map.mappings, "AAAA");
    assert_eq!(map.version, 3);
  }

  #[test]
  fn line_breaks_reset_generated_column() {
    let mut builder = SourceMapBuilder::new(false);
    builder.add_source("/a.js", None);
    builder.add_mapping(Mapping {
      generated_line: 0,
      generated_col: 4,
      source: 0,
      original_line: 0,
      original_col: 4,
      name: None,
    });
    builder.add_mapping(Mapping {
      generated_line: 1,
      generated_col: 2,
      source: 0,
      original_line: 1,
      original_col: 2,
      name: None,
    });
    let map = builder.build();
    assert_eq!(map.mappings, "IAAI;EACF");
  }

  #[test]
  fn base64_pads_tails() {
    assert_eq!(base64_encode(b"a"), "YQ==");
    assert_eq!(base64_encode(b"ab"), "YWI=");
    assert_eq!(base64_encode(b"abc"), "YWJj");
  }
}
