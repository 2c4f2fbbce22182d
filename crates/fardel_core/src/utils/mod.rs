mod name_helpers;
pub use name_helpers::*;
mod preset_of_used_names;
pub(crate) use preset_of_used_names::*;

use std::path::Path;
use std::str::FromStr;

use fardel_common::Loader;
use rustc_hash::FxHashMap;

pub fn extract_loader_by_path(path: &Path, overrides: &FxHashMap<String, Loader>) -> Loader {
  let ext = path.extension().and_then(|ext| ext.to_str());
  match ext {
    Some(ext) => {
      if let Some(loader) = overrides.get(&format!(".{ext}")) {
        return *loader;
      }
      // Unknown extensions parse as JavaScript for compatibility.
      Loader::by_extension(ext).unwrap_or(Loader::Js)
    }
    None => Loader::Js,
  }
}

pub fn parse_loader_flag(value: &str) -> fardel_error::Result<(String, Loader)> {
  let (ext, kind) = value.split_once('=').ok_or_else(|| {
    fardel_error::Error::invalid_options(format!("Invalid loader mapping: \"{value}\""))
  })?;
  Ok((ext.to_string(), Loader::from_str(kind)?))
}
