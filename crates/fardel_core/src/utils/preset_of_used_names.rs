use crate::ModuleFormat;

/// Names the output format environment already owns; the renamer must not
/// hand them out.
pub(crate) fn preset_of_used_names(format: ModuleFormat) -> Vec<String> {
  let mut preset: Vec<String> = ["Object", "Promise", "Uint8Array", "globalThis"]
    .iter()
    .map(|s| s.to_string())
    .collect();

  match format {
    ModuleFormat::Esm => {}
    ModuleFormat::Cjs | ModuleFormat::Iife | ModuleFormat::Umd => {
      preset.push("module".to_string());
      preset.push("require".to_string());
      preset.push("exports".to_string());
      preset.push("__filename".to_string());
      preset.push("__dirname".to_string());
      preset.push("define".to_string());
      preset.push("self".to_string());
    }
  }

  preset
}
