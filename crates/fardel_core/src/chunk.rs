//! One output file's worth of modules. The chunk decides every module's
//! printed shape: wrapped modules go into a `__modules` registry invoked
//! lazily through the runtime, inlined modules concatenate in execution
//! order under a `// <path>` banner, and the envelope adapts to the output
//! format.

use fardel_common::{
  ChunkId, ImportKind, ModuleId, SymbolKind, SymbolRef, NAMESPACE_SYMBOL_INDEX,
};
use fardel_runtime::RuntimeHelpers;
use fardel_sourcemap::{SourceMap, SourceMapBuilder};
use fardel_syntax::ast;
use fardel_syntax::{
  quote_string, PrintOptions, PrintedRef, Printer, RecordTarget, SymbolResolver,
};
use rustc_hash::FxHashMap;
use sugar_path::{AsPath, SugarPath};

use crate::{
  Graph, InputOptions, ModuleFormat, NormOrExt, NormalModule, OutputOptions,
};

#[derive(Debug)]
pub struct Chunk {
  pub id: ChunkId,
  pub name: String,
  pub filename: Option<String>,
  /// None for a synthesized shared chunk.
  pub entry: Option<ModuleId>,
  /// Sorted by module id.
  pub modules: Vec<ModuleId>,
  pub is_user_defined_entry: bool,
}

impl Chunk {
  pub(crate) fn new(
    id: ChunkId,
    name: String,
    entry: Option<ModuleId>,
    modules: Vec<ModuleId>,
    is_user_defined_entry: bool,
  ) -> Self {
    Self {
      id,
      name,
      filename: None,
      entry,
      modules,
      is_user_defined_entry,
    }
  }

  pub(crate) fn gen_file_name(&mut self, output_options: &OutputOptions) {
    let template = if self.entry.is_some() {
      &output_options.entry_file_names
    } else {
      &output_options.chunk_file_names
    };
    let mut filename = template.render(&self.name);
    for (from, to) in &output_options.out_extensions {
      if let Some(stripped) = filename.strip_suffix(from.as_str()) {
        filename = format!("{stripped}{to}");
        break;
      }
    }
    self.filename = Some(filename);
  }

  fn ordered_modules<'g>(&self, graph: &'g Graph) -> Vec<&'g NormalModule> {
    let mut modules: Vec<&NormalModule> = self
      .modules
      .iter()
      .filter_map(|id| graph.module(*id).as_norm())
      .collect();
    modules.sort_by_key(|m| m.exec_order);
    modules
  }

  /// Externals this chunk must bind or import for side effects, in
  /// discovery order: (module, needs_binding, needs_side_effect).
  fn external_deps(&self, graph: &Graph) -> Vec<(ModuleId, bool, bool)> {
    let mut deps: FxHashMap<ModuleId, (bool, bool)> = FxHashMap::default();
    for module in self.ordered_modules(graph) {
      if !module.is_included() {
        continue;
      }
      for record in &module.import_records {
        let Some(target) = record.resolved else {
          continue;
        };
        let NormOrExt::External(external) = graph.module(target) else {
          continue;
        };
        if record.is_require || record.is_dynamic_import {
          // loaded lazily at the call site
          continue;
        }
        let entry = deps.entry(target).or_default();
        match record.kind {
          ImportKind::SideEffect => entry.1 = true,
          _ => {
            if graph.used_symbols.contains(&external.namespace_symbol()) {
              entry.0 = true;
            } else {
              entry.1 = true;
            }
          }
        }
      }
      for &ext in &module.external_star_records {
        // re-exported externals stay reachable through the entry
        deps.entry(ext).or_default().1 = true;
      }
    }
    let mut ordered: Vec<(ModuleId, bool, bool)> = deps
      .into_iter()
      .map(|(id, (binding, side_effect))| (id, binding, side_effect))
      .collect();
    ordered.sort_by_key(|(id, _, _)| *id);
    ordered
  }

  fn wrapped_modules<'g>(&self, graph: &'g Graph) -> Vec<&'g NormalModule> {
    let mut wrapped: Vec<&NormalModule> = self
      .modules
      .iter()
      .filter_map(|id| graph.module(*id).as_norm())
      .filter(|m| m.must_wrap && m.wrapped_included)
      .collect();
    wrapped.sort_by_key(|m| m.exec_order);
    wrapped
  }

  /// Decide which runtime helpers this chunk's output will call, before the
  /// renamer runs so their names are reserved.
  pub(crate) fn collect_helpers(
    &self,
    graph: &Graph,
    output_options: &OutputOptions,
  ) -> RuntimeHelpers {
    let helpers = RuntimeHelpers::new();

    if !self.wrapped_modules(graph).is_empty() {
      helpers.require();
    }

    for module in self.ordered_modules(graph) {
      if module.must_wrap && module.wrapped_included {
        // wrapped ES modules publish their namespace through __export
        if !module.export_kind.is_commonjs_like() && !module.linked_exports.is_empty() {
          helpers.export();
        }
      }
      if let Some(ns_part) = module.namespace_part {
        if module.parts[ns_part].included && !module.linked_exports.is_empty() {
          helpers.export();
        }
      }
      for part in &module.parts {
        if !part.included && !module.wrapped_included {
          continue;
        }
        for &record_index in &part.import_records {
          let record = &module.import_records[record_index as usize];
          let Some(target) = record.resolved else {
            continue;
          };
          match graph.module(target) {
            NormOrExt::Normal(target_module) if target_module.must_wrap => {
              if record.is_require {
                helpers.require();
              } else if record.is_dynamic_import {
                helpers.import();
              } else {
                // a static import statement replacement
                let binding = self.import_statement_binding(module, record_index, target);
                if binding.is_some_and(|sym| graph.used_symbols.contains(&graph.canonical(sym)))
                {
                  helpers.import();
                } else {
                  helpers.require();
                }
              }
            }
            _ => {}
          }
        }
      }
    }

    if output_options.format.uses_require() && !self.external_deps(graph).is_empty() {
      let needs_binding = self
        .external_deps(graph)
        .iter()
        .any(|(_, binding, _)| *binding);
      if needs_binding {
        helpers.to_module();
      }
    }

    if let Some(entry) = self.entry {
      if let NormOrExt::Normal(entry_module) = graph.module(entry) {
        let wants_namespace = match output_options.format {
          ModuleFormat::Cjs | ModuleFormat::Umd => true,
          ModuleFormat::Iife => output_options.global_name.is_some(),
          ModuleFormat::Esm => false,
        };
        if entry_module.must_wrap {
          if wants_namespace || output_options.format.is_esm() {
            helpers.require();
          }
        } else if wants_namespace && !entry_module.linked_exports.is_empty() {
          helpers.export();
        }
      }
    }

    helpers
  }

  /// For a static import statement of a wrapped target: the binding printed
  /// on the left of `var <binding> = __import(id)`.
  fn import_statement_binding(
    &self,
    module: &NormalModule,
    record_index: u32,
    target: ModuleId,
  ) -> Option<SymbolRef> {
    let record = &module.import_records[record_index as usize];
    if record.kind == ImportKind::Namespace {
      return record.local_symbol;
    }
    module
      .interop_ns
      .get(&target)
      .map(|&index| SymbolRef::new(module.id, index))
  }

  pub(crate) fn render(&self, cx: &RenderChunkContext) -> crate::UnaryBuildResult<RenderedChunk> {
    let minify = cx.output_options.minify;
    let mut map_builder = cx
      .output_options
      .sourcemap
      .is_enabled()
      .then(|| SourceMapBuilder::new(cx.output_options.sources_content));

    let mut printer = Printer::new(
      PrintOptions {
        minify_whitespace: minify.whitespace,
      },
      map_builder.as_mut(),
    );
    let mut input_sizes: Vec<(ModuleId, usize)> = vec![];

    if let Some(banner) = &cx.output_options.banner {
      printer.push(banner);
      printer.hard_newline();
    }

    self.render_header(cx, &mut printer);
    self.render_runtime(cx, &mut printer);
    self.render_registry(cx, &mut printer, &mut input_sizes);
    self.render_inlined(cx, &mut printer, &mut input_sizes);
    self.render_entry_exports(cx, &mut printer);

    if let Some(footer) = &cx.output_options.footer {
      printer.hard_newline();
      printer.push(footer);
    }
    if !printer.is_empty() {
      printer.push("\n");
    }

    let code = printer.finish();
    let map = map_builder.map(|b| b.build());
    Ok(RenderedChunk {
      code,
      map,
      input_sizes,
    })
  }

  fn render_header(&self, cx: &RenderChunkContext, printer: &mut Printer) {
    match cx.output_options.format {
      ModuleFormat::Esm => {
        // cross-chunk imports first, then externals
        for (chunk_id, symbols) in cx.cross_imports {
          let filename = cx
            .chunk_filenames
            .get(chunk_id)
            .expect("imported chunk has a filename");
          let names = symbols
            .iter()
            .map(|(_, name)| name.clone())
            .collect::<Vec<_>>()
            .join(", ");
          printer.push(&format!("import {{ {names} }} from \"./{filename}\";"));
          printer.hard_newline();
        }
        for (ext, binding, side_effect) in self.external_deps(cx.graph) {
          let specifier = &cx.graph.module(ext).path().path;
          if binding {
            let ns = cx.external_name(ext);
            printer.push(&format!(
              "import * as {ns} from {};",
              quote_string(specifier)
            ));
            printer.hard_newline();
          } else if side_effect {
            printer.push(&format!("import {};", quote_string(specifier)));
            printer.hard_newline();
          }
        }
      }
      ModuleFormat::Cjs => {
        self.render_external_requires(cx, printer);
      }
      ModuleFormat::Iife => {
        if let Some(global_name) = &cx.output_options.global_name {
          printer.push(&format!("var {global_name} = "));
        }
        printer.push("(() => {");
        printer.hard_newline();
        self.render_external_requires(cx, printer);
      }
      ModuleFormat::Umd => {
        let name = cx
          .output_options
          .global_name
          .clone()
          .unwrap_or_else(|| crate::make_legal(&self.name));
        printer.push("(function (global, factory) {");
        printer.hard_newline();
        printer.push("  typeof exports === \"object\" && typeof module !== \"undefined\" ? module.exports = factory() :");
        printer.hard_newline();
        printer.push("  typeof define === \"function\" && define.amd ? define(factory) :");
        printer.hard_newline();
        printer.push(&format!(
          "  (global = typeof globalThis !== \"undefined\" ? globalThis : global || self, global.{name} = factory());"
        ));
        printer.hard_newline();
        printer.push("})(this, (function () {");
        printer.hard_newline();
        self.render_external_requires(cx, printer);
      }
    }
  }

  fn render_external_requires(&self, cx: &RenderChunkContext, printer: &mut Printer) {
    for (ext, binding, side_effect) in self.external_deps(cx.graph) {
      let specifier = &cx.graph.module(ext).path().path;
      if binding {
        let ns = cx.external_name(ext);
        printer.push(&format!(
          "var {ns} = __toModule(require({}));",
          quote_string(specifier)
        ));
        printer.hard_newline();
      } else if side_effect {
        printer.push(&format!("require({});", quote_string(specifier)));
        printer.hard_newline();
      }
    }
  }

  fn render_runtime(&self, cx: &RenderChunkContext, printer: &mut Printer) {
    for snippet in cx.helpers.generate_helpers() {
      printer.push(snippet.trim_end());
      printer.hard_newline();
    }
  }

  fn render_registry(
    &self,
    cx: &RenderChunkContext,
    printer: &mut Printer,
    input_sizes: &mut Vec<(ModuleId, usize)>,
  ) {
    let wrapped = self.wrapped_modules(cx.graph);
    if wrapped.is_empty() {
      return;
    }
    printer.push("var __modules = {");
    printer.indent_more();
    for module in wrapped {
      let before = printer.len();
      printer.newline();
      self.render_wrapped_module(cx, printer, module);
      input_sizes.push((module.id, printer.len() - before));
    }
    printer.indent_less();
    printer.newline();
    printer.push("};");
    printer.hard_newline();
  }

  fn render_wrapped_module(
    &self,
    cx: &RenderChunkContext,
    printer: &mut Printer,
    module: &NormalModule,
  ) {
    if !cx.output_options.minify.whitespace {
      let relative = module
        .path
        .path
        .as_path()
        .relative(cx.input_options.cwd.as_path());
      printer.push(&format!("// {}", relative.display()));
      printer.newline();
    }
    printer.add_source(&module.path.path, Some(module.source.clone()));

    let is_cjs = module.export_kind.is_commonjs_like();
    if is_cjs {
      printer.push(&format!("{}(exports, module) {{", module.id));
    } else {
      printer.push(&format!("{}(exports) {{", module.id));
    }
    printer.indent_more();

    if !is_cjs {
      printer.newline();
      printer.push("Object.defineProperty(exports, \"__esModule\", { value: true });");
      if !module.linked_exports.is_empty() {
        printer.newline();
        let mut exports: Vec<(&String, SymbolRef)> = module
          .linked_exports
          .iter()
          .map(|(name, spec)| (name, spec.symbol))
          .collect();
        exports.sort_by(|a, b| a.0.cmp(b.0));
        let resolver = cx.resolver_for(module.id);
        printer.push("__export(exports, {");
        for (i, (name, symbol)) in exports.iter().enumerate() {
          if i > 0 {
            printer.push(",");
          }
          printer.push(" ");
          printer.push(&quote_prop(name));
          printer.push(": () => ");
          let printed = resolver.printed_ref(*symbol, name);
          match printed {
            PrintedRef::Name(n) => printer.push(&n),
            PrintedRef::Alias { ns, prop } => {
              printer.push(&ns);
              printer.push(".");
              printer.push(&prop);
            }
          }
        }
        printer.push(" });");
      }
    }

    let resolver = cx.resolver_for(module.id);
    self.render_module_parts(cx, printer, module, &resolver);

    printer.indent_less();
    printer.newline();
    printer.push("},");
  }

  fn render_inlined(
    &self,
    cx: &RenderChunkContext,
    printer: &mut Printer,
    input_sizes: &mut Vec<(ModuleId, usize)>,
  ) {
    for module in self.ordered_modules(cx.graph) {
      if module.must_wrap || !module.is_included() {
        continue;
      }
      let before = printer.len();
      if !cx.output_options.minify.whitespace {
        let relative = module
          .path
          .path
          .as_path()
          .relative(cx.input_options.cwd.as_path());
        printer.push(&format!("// {}", relative.display()));
      }
      printer.add_source(&module.path.path, Some(module.source.clone()));
      let resolver = cx.resolver_for(module.id);
      self.render_module_parts(cx, printer, module, &resolver);
      printer.hard_newline();
      input_sizes.push((module.id, printer.len() - before));
    }
  }

  /// The namespace object goes first so cyclic importers can reach it; then
  /// every included part in statement order.
  fn render_module_parts(
    &self,
    cx: &RenderChunkContext,
    printer: &mut Printer,
    module: &NormalModule,
    resolver: &ChunkSymbolResolver,
  ) {
    let include_all = module.wrapped_included;
    if let Some(ns_index) = module.namespace_part {
      let part = &module.parts[ns_index];
      if part.included || include_all {
        printer.newline();
        printer.print_stmt(&module.ast.body[part.stmt_index as usize], resolver);
      }
    }
    for (index, part) in module.parts.iter().enumerate() {
      if Some(index) == module.namespace_part {
        continue;
      }
      if !part.included && !include_all {
        continue;
      }
      let stmt = &module.ast.body[part.stmt_index as usize];
      match stmt {
        ast::Stmt::Import(_)
        | ast::Stmt::ExportNamed(_)
        | ast::Stmt::ExportAll { .. } => {
          self.render_import_statement(cx, printer, module, part, resolver);
        }
        ast::Stmt::ExportDecl { decl, .. } => {
          printer.newline();
          printer.print_stmt(decl, resolver);
        }
        ast::Stmt::ExportDefault { value, sym, .. } => {
          printer.newline();
          printer.print_export_default_as_decl(value, *sym, resolver);
        }
        other => {
          printer.newline();
          printer.print_stmt(other, resolver);
        }
      }
    }
  }

  /// Static imports of wrapped targets instantiate the target here:
  /// `var ns = __import(id);` when the binding is live, a bare
  /// `__require(id);` when only the side effects matter.
  fn render_import_statement(
    &self,
    cx: &RenderChunkContext,
    printer: &mut Printer,
    module: &NormalModule,
    part: &fardel_syntax::StatementPart,
    resolver: &ChunkSymbolResolver,
  ) {
    let mut instantiated: Vec<ModuleId> = vec![];
    for &record_index in &part.import_records {
      let record = &module.import_records[record_index as usize];
      let Some(target) = record.resolved else {
        continue;
      };
      let NormOrExt::Normal(target_module) = cx.graph.module(target) else {
        continue;
      };
      if !target_module.must_wrap || instantiated.contains(&target) {
        continue;
      }
      instantiated.push(target);

      let binding = self.import_statement_binding(module, record_index, target);
      let live_binding = binding
        .filter(|sym| cx.graph.used_symbols.contains(&cx.graph.canonical(*sym)));
      printer.newline();
      match live_binding {
        Some(sym) => {
          let name = match resolver.printed_ref(sym, "") {
            PrintedRef::Name(name) => name,
            PrintedRef::Alias { ns, prop } => format!("{ns}.{prop}"),
          };
          printer.push(&format!("var {name} = __import({});", target));
        }
        None => {
          if target_module.has_side_effects {
            printer.push(&format!("__require({});", target));
          }
        }
      }
    }
  }

  fn render_entry_exports(&self, cx: &RenderChunkContext, printer: &mut Printer) {
    let format = cx.output_options.format;

    // shared chunks only re-export for their entry chunks
    let entry_module = self.entry.and_then(|id| cx.graph.module(id).as_norm());

    match format {
      ModuleFormat::Esm => {
        if !cx.chunk_exports.is_empty() {
          // Plain symbols export directly; re-exports of external names go
          // back out through the external module; anything else (rare
          // late-binding aliases) gets a forwarding variable first.
          let mut pieces = vec![];
          let mut external_pieces: Vec<(String, String, String)> = vec![];
          let mut forwarded = 0usize;
          for (exported_as, symbol) in cx.chunk_exports {
            let canonical = cx.graph.canonical(*symbol);
            let data = cx.graph.symbol_data(canonical);
            if let Some(alias) = &data.namespace_alias {
              let ns_canonical = cx.graph.canonical(alias.namespace);
              if let NormOrExt::External(external) = cx.graph.module(ns_canonical.module) {
                external_pieces.push((
                  external.path.path.clone(),
                  alias.prop.clone(),
                  exported_as.clone(),
                ));
                continue;
              }
              let forward = format!("__reexport{}", forwarded + 1);
              forwarded += 1;
              printer.push(&format!("var {forward} = {};", cx.final_name(canonical)));
              printer.hard_newline();
              pieces.push(format!("{forward} as {exported_as}"));
              continue;
            }
            let final_name = cx.final_name(canonical);
            if &final_name == exported_as {
              pieces.push(final_name);
            } else {
              pieces.push(format!("{final_name} as {exported_as}"));
            }
          }
          for (specifier, imported, exported) in external_pieces {
            if imported == exported {
              printer.push(&format!(
                "export {{ {imported} }} from {};",
                quote_string(&specifier)
              ));
            } else {
              printer.push(&format!(
                "export {{ {imported} as {exported} }} from {};",
                quote_string(&specifier)
              ));
            }
            printer.hard_newline();
          }
          if !pieces.is_empty() {
            printer.push(&format!("export {{ {} }};", pieces.join(", ")));
            printer.hard_newline();
          }
        }
        if let Some(entry) = entry_module {
          if entry.must_wrap {
            printer.push(&format!("export default __require({});", entry.id));
            printer.hard_newline();
          }
          for &ext in &entry.external_star_records {
            let specifier = &cx.graph.module(ext).path().path;
            printer.push(&format!("export * from {};", quote_string(specifier)));
            printer.hard_newline();
          }
        }
      }
      ModuleFormat::Cjs => {
        if let Some(entry) = entry_module {
          if entry.must_wrap {
            printer.push(&format!("module.exports = __require({});", entry.id));
            printer.hard_newline();
          } else if !entry.linked_exports.is_empty() {
            printer.push(&self.entry_namespace_object(cx, entry, "module.exports"));
            printer.hard_newline();
          }
        }
      }
      ModuleFormat::Iife => {
        if let Some(entry) = entry_module {
          if cx.output_options.global_name.is_some() {
            if entry.must_wrap {
              printer.push(&format!("return __require({});", entry.id));
            } else if !entry.linked_exports.is_empty() {
              printer.push(&self.entry_namespace_object(cx, entry, ""));
            }
            printer.hard_newline();
          }
        }
        printer.push("})();");
      }
      ModuleFormat::Umd => {
        if let Some(entry) = entry_module {
          if entry.must_wrap {
            printer.push(&format!("return __require({});", entry.id));
          } else if !entry.linked_exports.is_empty() {
            printer.push(&self.entry_namespace_object(cx, entry, ""));
          }
          printer.hard_newline();
        }
        printer.push("}));");
      }
    }
  }

  /// `__export({...})` over the entry's namespace, either returned (IIFE,
  /// UMD) or assigned (`module.exports`).
  fn entry_namespace_object(
    &self,
    cx: &RenderChunkContext,
    entry: &NormalModule,
    assign_to: &str,
  ) -> String {
    let mut exports: Vec<(&String, SymbolRef)> = entry
      .linked_exports
      .iter()
      .map(|(name, spec)| (name, spec.symbol))
      .collect();
    exports.sort_by(|a, b| a.0.cmp(b.0));
    let getters = exports
      .iter()
      .map(|(name, symbol)| format!("{}: () => {}", quote_prop(name), cx.final_name(*symbol)))
      .collect::<Vec<_>>()
      .join(", ");
    if assign_to.is_empty() {
      format!("return __export({{}}, {{ {getters} }});")
    } else {
      format!("__export({assign_to}, {{ {getters} }});")
    }
  }
}

fn quote_prop(name: &str) -> String {
  let is_ident = !name.is_empty()
    && name
      .chars()
      .next()
      .map(|c| c.is_alphabetic() || c == '_' || c == '$')
      .unwrap_or(false)
    && name
      .chars()
      .all(|c| c.is_alphanumeric() || c == '_' || c == '$');
  if is_ident {
    name.to_string()
  } else {
    quote_string(name)
  }
}

pub(crate) struct RenderedChunk {
  pub code: String,
  pub map: Option<SourceMap>,
  /// Per-module contribution to the output, for the metafile.
  pub input_sizes: Vec<(ModuleId, usize)>,
}

pub(crate) struct RenderChunkContext<'a> {
  pub graph: &'a Graph,
  pub input_options: &'a InputOptions,
  pub output_options: &'a OutputOptions,
  pub helpers: &'a RuntimeHelpers,
  /// Final names assigned for this chunk, externals included.
  pub names: &'a FxHashMap<SymbolRef, String>,
  /// Final names of symbols owned by other chunks.
  pub global_names: &'a FxHashMap<SymbolRef, String>,
  /// Imports from other chunks: (chunk, [(symbol, final name)]).
  pub cross_imports: &'a [(ChunkId, Vec<(SymbolRef, String)>)],
  /// This chunk's ESM exports: (exported name, symbol).
  pub chunk_exports: &'a [(String, SymbolRef)],
  pub chunk_filenames: &'a FxHashMap<ChunkId, String>,
}

impl<'a> RenderChunkContext<'a> {
  fn resolver_for(&self, module: ModuleId) -> ChunkSymbolResolver<'_> {
    ChunkSymbolResolver {
      graph: self.graph,
      names: self.names,
      global_names: self.global_names,
      module,
    }
  }

  fn final_name(&self, sym: SymbolRef) -> String {
    let canonical = self.graph.canonical(sym);
    let data = self.graph.symbol_data(canonical);
    if let Some(alias) = &data.namespace_alias {
      let ns = self.final_name(alias.namespace);
      return format!("{ns}.{}", alias.prop);
    }
    self
      .names
      .get(&canonical)
      .or_else(|| self.global_names.get(&canonical))
      .cloned()
      .unwrap_or_else(|| data.name.clone())
  }

  fn external_name(&self, ext: ModuleId) -> String {
    self.final_name(SymbolRef::new(ext, NAMESPACE_SYMBOL_INDEX))
  }
}

pub(crate) struct ChunkSymbolResolver<'a> {
  graph: &'a Graph,
  names: &'a FxHashMap<SymbolRef, String>,
  global_names: &'a FxHashMap<SymbolRef, String>,
  module: ModuleId,
}

impl<'a> ChunkSymbolResolver<'a> {
  fn lookup(&self, canonical: SymbolRef) -> Option<String> {
    self
      .names
      .get(&canonical)
      .or_else(|| self.global_names.get(&canonical))
      .cloned()
  }
}

impl<'a> SymbolResolver for ChunkSymbolResolver<'a> {
  fn printed_ref(&self, sym: SymbolRef, original: &str) -> PrintedRef {
    let canonical = self.graph.canonical(sym);
    let data = self.graph.symbol_data(canonical);
    if let Some(alias) = &data.namespace_alias {
      let ns_canonical = self.graph.canonical(alias.namespace);
      let ns_name = self
        .lookup(ns_canonical)
        .unwrap_or_else(|| self.graph.symbol_data(ns_canonical).name.clone());
      return PrintedRef::Alias {
        ns: ns_name,
        prop: alias.prop.clone(),
      };
    }
    match self.lookup(canonical) {
      Some(name) => PrintedRef::Name(name),
      None => {
        let fallback = if data.name.is_empty() {
          original.to_string()
        } else {
          data.name.clone()
        };
        // Host globals print verbatim; unrenamed module symbols (inside
        // wrapped modules) still need identifier-safe names.
        let fallback = if data.kind == SymbolKind::Unbound {
          fallback
        } else {
          crate::make_legal(&fallback)
        };
        PrintedRef::Name(fallback)
      }
    }
  }

  fn record_target(&self, record: u32) -> RecordTarget {
    let module = self.graph.module(self.module).expect_norm();
    let record = &module.import_records[record as usize];
    match record.resolved {
      Some(target) => match self.graph.module(target) {
        NormOrExt::External(external) => {
          if record.is_dynamic_import {
            RecordTarget::ExternalImport(external.path.path.clone())
          } else {
            RecordTarget::ExternalRequire(external.path.path.clone())
          }
        }
        NormOrExt::Normal(_) => {
          if record.is_dynamic_import {
            RecordTarget::Import(target.raw())
          } else {
            RecordTarget::Require(target.raw())
          }
        }
      },
      None => RecordTarget::ExternalRequire(record.specifier.clone()),
    }
  }
}
