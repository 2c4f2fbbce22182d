//! End-to-end bundling scenarios over an in-memory file tree.

use fardel_test_utils::test_config::{InputConfig, OutputConfig, TestConfig};
use fardel_test_utils::tester::Tester;

fn config(entries: &[&str]) -> TestConfig {
  TestConfig {
    input: InputConfig {
      entries: entries.iter().map(|s| s.to_string()).collect(),
      ..Default::default()
    },
    ..Default::default()
  }
}

#[tokio::test]
async fn unused_namespace_import_elides_the_import() {
  let tester = Tester::from_files(
    &["/entry.ts"],
    &[
      (
        "/entry.ts",
        "import * as ns from './foo'\nlet foo = 234\nconsole.log(foo)",
      ),
      ("/foo.ts", "export const foo = 123"),
    ],
  );
  let assets = tester.bundle().await.unwrap();
  assert_eq!(assets.len(), 1);
  let code = assets[0].content_as_str();
  assert!(code.contains("let foo = 234;"), "{code}");
  assert!(code.contains("console.log(foo);"), "{code}");
  assert!(!code.contains("123"), "unused module should be dropped: {code}");
  assert!(!code.contains("foo.ts"), "{code}");
  assert!(!code.contains("__export"), "{code}");
}

#[tokio::test]
async fn captured_namespace_materializes_an_exports_object() {
  let tester = Tester::from_files(
    &["/entry.ts"],
    &[
      (
        "/entry.ts",
        "import * as ns from './foo'\nlet foo = 234\nconsole.log(ns, ns.foo, foo)",
      ),
      ("/foo.ts", "export const foo = 123"),
    ],
  );
  let assets = tester.bundle().await.unwrap();
  let code = assets[0].content_as_str();
  // the namespace object is a getter map over the renamed constant
  assert!(code.contains("__export"), "{code}");
  assert!(code.contains("foo: () => foo2"), "{code}");
  assert!(code.contains("const foo2 = 123;"), "{code}");
  // the property access still collapses to a direct reference
  assert!(code.contains("console.log(ns, foo2, foo);"), "{code}");
}

#[tokio::test]
async fn plain_property_access_rewrites_to_a_direct_reference() {
  let tester = Tester::from_files(
    &["/entry.ts"],
    &[
      (
        "/entry.ts",
        "import * as ns from './foo'\nconsole.log(ns.foo, ns.foo)",
      ),
      ("/foo.ts", "export const foo = 123"),
    ],
  );
  let assets = tester.bundle().await.unwrap();
  let code = assets[0].content_as_str();
  assert!(code.contains("console.log(foo, foo);"), "{code}");
  assert!(
    !code.contains("__export"),
    "no namespace object may materialize: {code}"
  );
  assert!(code.contains("const foo = 123;"), "{code}");
}

#[tokio::test]
async fn commonjs_import_always_goes_through_the_registry() {
  let tester = Tester::from_files(
    &["/entry.ts"],
    &[
      (
        "/entry.ts",
        "import * as ns from './foo'\nconsole.log(ns, ns.foo)",
      ),
      ("/foo.ts", "exports.foo = 123"),
    ],
  );
  let assets = tester.bundle().await.unwrap();
  let code = assets[0].content_as_str();
  assert!(code.contains("var __modules = {"), "{code}");
  assert!(code.contains("1(exports, module) {"), "{code}");
  assert!(code.contains("exports.foo = 123;"), "{code}");
  assert!(code.contains("var ns = __import(1);"), "{code}");
  assert!(code.contains("console.log(ns, ns.foo);"), "{code}");
}

#[tokio::test]
async fn export_star_flattens_only_when_namespace_is_captured() {
  let files: &[(&str, &str)] = &[
    ("/bar.ts", "export * from './foo'"),
    ("/foo.ts", "export const foo = 123"),
  ];

  // captured: the namespace object carries the flattened name
  let mut captured_files = files.to_vec();
  captured_files.push((
    "/entry.ts",
    "import * as bar from './bar'\nconsole.log(bar)",
  ));
  let tester = Tester::from_files(&["/entry.ts"], &captured_files);
  let assets = tester.bundle().await.unwrap();
  let code = assets[0].content_as_str();
  assert!(code.contains("__export"), "{code}");
  assert!(code.contains("foo: () => foo"), "{code}");

  // not captured: the access rewrites through to the constant
  let mut plain_files = files.to_vec();
  plain_files.push((
    "/entry.ts",
    "import * as bar from './bar'\nconsole.log(bar.foo)",
  ));
  let tester = Tester::from_files(&["/entry.ts"], &plain_files);
  let assets = tester.bundle().await.unwrap();
  let code = assets[0].content_as_str();
  assert!(!code.contains("__export"), "{code}");
  assert!(code.contains("console.log(foo);"), "{code}");
}

#[tokio::test]
async fn splitting_shares_a_chunk_between_entries() {
  let config = TestConfig {
    input: InputConfig {
      entries: vec!["/a.js".to_string(), "/b.js".to_string()],
      ..Default::default()
    },
    output: OutputConfig {
      format: "esm".to_string(),
      splitting: true,
      ..Default::default()
    },
  };
  let tester = Tester::new(
    config,
    &[
      (
        "/a.js",
        "import { greet } from './common'\nconsole.log(greet('a'))",
      ),
      (
        "/b.js",
        "import { greet } from './common'\nconsole.log(greet('b'))",
      ),
      (
        "/common.js",
        "export function greet(name) { return 'hi ' + name }",
      ),
    ],
  );
  let assets = tester.bundle().await.unwrap();
  let names: Vec<&str> = {
    let mut names: Vec<&str> = assets.iter().map(|a| a.filename.as_str()).collect();
    names.sort();
    names
  };
  assert_eq!(names, vec!["a.js", "b.js", "shared.js"]);

  let shared = assets.iter().find(|a| a.filename == "shared.js").unwrap();
  assert!(
    shared.content_as_str().contains("function greet"),
    "{}",
    shared.content_as_str()
  );
  assert!(shared.content_as_str().contains("export { greet };"));

  for entry in ["a.js", "b.js"] {
    let asset = assets.iter().find(|a| a.filename == entry).unwrap();
    let code = asset.content_as_str();
    assert!(
      code.contains("import { greet } from \"./shared.js\";"),
      "{code}"
    );
    assert!(!code.contains("function greet"), "{code}");
  }
}

#[tokio::test]
async fn named_imports_link_through_re_export_chains() {
  let tester = Tester::from_files(
    &["/entry.js"],
    &[
      ("/entry.js", "import { value } from './middle'\nconsole.log(value)"),
      ("/middle.js", "export { value } from './leaf'"),
      ("/leaf.js", "export const value = 42"),
    ],
  );
  let assets = tester.bundle().await.unwrap();
  let code = assets[0].content_as_str();
  assert!(code.contains("const value = 42;"), "{code}");
  assert!(code.contains("console.log(value);"), "{code}");
  assert!(!code.contains("__export"), "{code}");
}

#[tokio::test]
async fn missing_named_export_is_a_link_error() {
  let tester = Tester::from_files(
    &["/entry.js"],
    &[
      ("/entry.js", "import { missing } from './dep'\nconsole.log(missing)"),
      ("/dep.js", "export const present = 1"),
    ],
  );
  let result = tester.bundle().await;
  let errors = result.expect_err("missing export must fail the build");
  let message = errors.to_string();
  assert!(message.contains("\"missing\" is not exported"), "{message}");
}

#[tokio::test]
async fn unresolved_relative_import_is_reported_at_the_import_site() {
  let tester = Tester::from_files(
    &["/entry.js"],
    &[("/entry.js", "import { x } from './nope'\nconsole.log(x)")],
  );
  let errors = tester.bundle().await.expect_err("unresolved import");
  assert!(errors.to_string().contains("./nope"), "{errors}");
}

#[tokio::test]
async fn side_effect_statements_survive_in_imported_modules() {
  let tester = Tester::from_files(
    &["/entry.js"],
    &[
      ("/entry.js", "import './log'\nlet x = 1\nconsole.log(x)"),
      ("/log.js", "console.log('imported for effect')\nexport const unused = 5"),
    ],
  );
  let assets = tester.bundle().await.unwrap();
  let code = assets[0].content_as_str();
  assert!(code.contains("console.log(\"imported for effect\")") || code.contains("console.log('imported for effect')"), "{code}");
  assert!(!code.contains("unused = 5"), "{code}");
}

#[tokio::test]
async fn require_calls_rewrite_to_the_runtime() {
  let tester = Tester::from_files(
    &["/entry.js"],
    &[
      ("/entry.js", "const dep = require('./dep')\nconsole.log(dep.answer)"),
      ("/dep.js", "exports.answer = 42"),
    ],
  );
  let assets = tester.bundle().await.unwrap();
  let code = assets[0].content_as_str();
  assert!(code.contains("__require(1)"), "{code}");
  assert!(code.contains("exports.answer = 42;"), "{code}");
  assert!(code.contains("var __commonJS"), "{code}");
}

#[tokio::test]
async fn dynamic_import_wraps_the_target_lazily() {
  let tester = Tester::from_files(
    &["/entry.js"],
    &[
      ("/entry.js", "import('./lazy').then((m) => console.log(m.hello))"),
      ("/lazy.js", "export const hello = 'there'"),
    ],
  );
  let assets = tester.bundle().await.unwrap();
  let code = assets[0].content_as_str();
  assert!(
    code.contains("Promise.resolve().then(() => __import(1))"),
    "{code}"
  );
  assert!(code.contains("var __modules = {"), "{code}");
  assert!(code.contains("__esModule"), "{code}");
}

#[tokio::test]
async fn circular_esm_imports_stay_late_bound() {
  let tester = Tester::from_files(
    &["/a.js"],
    &[
      (
        "/a.js",
        "import { b } from './b'\nexport function a() { return 'a' + b() }\nconsole.log(a())",
      ),
      (
        "/b.js",
        "import { a } from './a'\nexport function b() { return 'b' }\nexport function useA() { return a() }",
      ),
    ],
  );
  let assets = tester.bundle().await.unwrap();
  let code = assets[0].content_as_str();
  // both function declarations are hoisted into the chunk
  assert!(code.contains("function a()"), "{code}");
  assert!(code.contains("function b()"), "{code}");
  assert!(code.contains("console.log(a());"), "{code}");
}

#[tokio::test]
async fn externals_keep_their_specifiers_verbatim() {
  let config = TestConfig {
    input: InputConfig {
      entries: vec!["/entry.js".to_string()],
      external: vec!["left-pad".to_string()],
      ..Default::default()
    },
    ..Default::default()
  };
  let tester = Tester::new(
    config,
    &[(
      "/entry.js",
      "import pad from 'left-pad'\nconsole.log(pad('x', 3))",
    )],
  );
  let assets = tester.bundle().await.unwrap();
  let code = assets[0].content_as_str();
  assert!(
    code.contains("import * as left_pad from \"left-pad\";"),
    "{code}"
  );
  assert!(code.contains("left_pad.default"), "{code}");
}

#[tokio::test]
async fn iife_format_wraps_and_returns_the_entry_namespace() {
  let config = TestConfig {
    input: InputConfig {
      entries: vec!["/entry.js".to_string()],
      ..Default::default()
    },
    output: OutputConfig {
      format: "iife".to_string(),
      global_name: Some("lib".to_string()),
      ..Default::default()
    },
  };
  let tester = Tester::new(
    config,
    &[("/entry.js", "export const answer = 42\nconsole.log(answer)")],
  );
  let assets = tester.bundle().await.unwrap();
  let code = assets[0].content_as_str();
  assert!(code.starts_with("var lib = (() => {"), "{code}");
  assert!(code.contains("return __export({}, { answer: () => answer });"), "{code}");
  assert!(code.trim_end().ends_with("})();"), "{code}");
}

#[tokio::test]
async fn cjs_format_assigns_module_exports() {
  let config = TestConfig {
    input: InputConfig {
      entries: vec!["/entry.js".to_string()],
      ..Default::default()
    },
    output: OutputConfig {
      format: "cjs".to_string(),
      ..Default::default()
    },
  };
  let tester = Tester::new(
    config,
    &[("/entry.js", "export const answer = 42\nconsole.log(answer)")],
  );
  let assets = tester.bundle().await.unwrap();
  let code = assets[0].content_as_str();
  assert!(
    code.contains("__export(module.exports, { answer: () => answer });"),
    "{code}"
  );
}

#[tokio::test]
async fn umd_format_emits_the_standard_preamble() {
  let config = TestConfig {
    input: InputConfig {
      entries: vec!["/entry.js".to_string()],
      ..Default::default()
    },
    output: OutputConfig {
      format: "umd".to_string(),
      global_name: Some("lib".to_string()),
      ..Default::default()
    },
  };
  let tester = Tester::new(config, &[("/entry.js", "export const one = 1")]);
  let assets = tester.bundle().await.unwrap();
  let code = assets[0].content_as_str();
  assert!(code.contains("typeof define === \"function\" && define.amd"), "{code}");
  assert!(code.contains("global.lib = factory()"), "{code}");
  assert!(code.trim_end().ends_with("}));"), "{code}");
}

#[tokio::test]
async fn builds_are_deterministic() {
  let files: &[(&str, &str)] = &[
    (
      "/entry.js",
      "import { a } from './a'\nimport { b } from './b'\nconsole.log(a, b)",
    ),
    ("/a.js", "export const a = 'a'\nexport const unused = 1"),
    ("/b.js", "import { a } from './a'\nexport const b = a + 'b'"),
  ];
  let first = Tester::from_files(&["/entry.js"], files)
    .bundle()
    .await
    .unwrap();
  let second = Tester::from_files(&["/entry.js"], files)
    .bundle()
    .await
    .unwrap();
  assert_eq!(
    Tester::assets_to_string(&first),
    Tester::assets_to_string(&second)
  );
}

#[tokio::test]
async fn renamed_symbols_stay_unique_within_a_chunk() {
  let tester = Tester::from_files(
    &["/entry.js"],
    &[
      (
        "/entry.js",
        "import { value } from './a'\nimport { value as other } from './b'\nconst mine = 9\nconsole.log(value, other, mine)",
      ),
      ("/a.js", "export const value = 1"),
      ("/b.js", "export const value = 2"),
    ],
  );
  let assets = tester.bundle().await.unwrap();
  let code = assets[0].content_as_str();
  // three distinct declarations with three distinct names
  assert!(code.contains("const value = 1;"), "{code}");
  assert!(code.contains("const value2 = 2;"), "{code}");
  assert!(code.contains("const mine = 9;"), "{code}");
  assert!(code.contains("console.log(value, value2, mine);"), "{code}");
}

#[tokio::test]
async fn treeshake_can_be_disabled() {
  let config = TestConfig {
    input: InputConfig {
      entries: vec!["/entry.js".to_string()],
      treeshake: false,
      ..Default::default()
    },
    ..Default::default()
  };
  let tester = Tester::new(
    config,
    &[
      ("/entry.js", "import { used } from './lib'\nconsole.log(used)"),
      ("/lib.js", "export const used = 1\nexport const unused = 2"),
    ],
  );
  let assets = tester.bundle().await.unwrap();
  let code = assets[0].content_as_str();
  assert!(code.contains("unused = 2"), "{code}");
}

#[tokio::test]
async fn entry_exports_are_tree_shaking_roots() {
  let tester = Tester::from_files(
    &["/entry.js"],
    &[
      ("/entry.js", "export { kept } from './lib'"),
      ("/lib.js", "export const kept = 'yes'\nexport const dropped = 'no'"),
    ],
  );
  let assets = tester.bundle().await.unwrap();
  let code = assets[0].content_as_str();
  assert!(code.contains("kept = \"yes\"") || code.contains("kept = 'yes'"), "{code}");
  assert!(!code.contains("dropped"), "{code}");
  assert!(code.contains("export { kept };"), "{code}");
}

#[tokio::test]
async fn ambiguous_star_export_names_are_dropped() {
  let tester = Tester::from_files(
    &["/entry.js"],
    &[
      (
        "/entry.js",
        "import * as ns from './both'\nconsole.log(ns)",
      ),
      ("/both.js", "export * from './x'\nexport * from './y'"),
      ("/x.js", "export const shared = 'x'\nexport const only_x = 1"),
      ("/y.js", "export const shared = 'y'\nexport const only_y = 2"),
    ],
  );
  let assets = tester.bundle().await.unwrap();
  let code = assets[0].content_as_str();
  assert!(code.contains("only_x"), "{code}");
  assert!(code.contains("only_y"), "{code}");
  // the conflicting name is removed from the namespace
  assert!(!code.contains("shared: () =>"), "{code}");
}

#[tokio::test]
async fn json_imports_become_default_exports() {
  let tester = Tester::from_files(
    &["/entry.js"],
    &[
      ("/entry.js", "import settings from './settings.json'\nconsole.log(settings.port)"),
      ("/settings.json", "{ \"port\": 8080 }"),
    ],
  );
  let assets = tester.bundle().await.unwrap();
  let code = assets[0].content_as_str();
  assert!(code.contains("8080"), "{code}");
}

#[tokio::test]
async fn define_replaces_free_identifiers() {
  let mut config = config(&["/entry.js"]);
  config.input.entries = vec!["/entry.js".to_string()];
  let tester = Tester::new(
    config,
    &[("/entry.js", "if (DEBUG) { console.log('dev') }")],
  );
  let mut input = tester.input_options();
  input.define.insert("DEBUG".to_string(), "false".to_string());
  let mut bundler = fardel_core::Bundler::new(input);
  let assets = bundler.generate(tester.output_options()).await.unwrap();
  let code = assets[0].content_as_str();
  assert!(code.contains("if (false)"), "{code}");
  assert!(!code.contains("DEBUG"), "{code}");
}

#[tokio::test]
async fn module_ids_start_at_the_first_entry() {
  // the first entry always owns module id 0: a CommonJS dependency of the
  // entry lands in the registry under id 1
  let tester = Tester::from_files(
    &["/entry.js"],
    &[
      ("/entry.js", "const x = require('./one')\nconsole.log(x)"),
      ("/one.js", "module.exports = 1"),
    ],
  );
  let assets = tester.bundle().await.unwrap();
  let code = assets[0].content_as_str();
  assert!(code.contains("1(exports, module)"), "{code}");
  assert!(code.contains("__require(1)"), "{code}");
}

#[tokio::test]
async fn inline_source_maps_append_a_data_url() {
  let tester = Tester::from_files(
    &["/entry.js"],
    &[("/entry.js", "const a = 1\nconsole.log(a)")],
  );
  let mut output = tester.output_options();
  output.sourcemap = fardel_core::SourceMapMode::Inline;
  let mut bundler = fardel_core::Bundler::new(tester.input_options());
  let assets = bundler.generate(output).await.unwrap();
  assert_eq!(assets.len(), 1);
  let code = assets[0].content_as_str();
  assert!(
    code.contains("//# sourceMappingURL=data:application/json;base64,"),
    "{code}"
  );
}

#[tokio::test]
async fn external_source_maps_become_their_own_asset() {
  let tester = Tester::from_files(
    &["/entry.js"],
    &[("/entry.js", "const a = 1\nconsole.log(a)")],
  );
  let mut output = tester.output_options();
  output.sourcemap = fardel_core::SourceMapMode::External;
  let mut bundler = fardel_core::Bundler::new(tester.input_options());
  let assets = bundler.generate(output).await.unwrap();
  let map = assets
    .iter()
    .find(|a| a.filename == "entry.js.map")
    .expect("map asset");
  assert!(map.content_as_str().contains("\"version\":3"));
  assert!(map.content_as_str().contains("/entry.js"));
  let code = assets
    .iter()
    .find(|a| a.filename == "entry.js")
    .unwrap()
    .content_as_str();
  assert!(code.contains("//# sourceMappingURL=entry.js.map"), "{code}");
}

#[tokio::test]
async fn analyse_reports_inputs_and_their_imports() {
  let tester = Tester::from_files(
    &["/entry.js"],
    &[
      ("/entry.js", "import { a } from './dep'\nconsole.log(a)"),
      ("/dep.js", "export const a = 1"),
    ],
  );
  let mut bundler = fardel_core::Bundler::new(tester.input_options());
  let json = bundler.analyse().await.unwrap();
  let value: serde_json::Value = serde_json::from_str(&json).unwrap();
  let inputs = value.get("inputs").unwrap().as_object().unwrap();
  assert!(inputs.contains_key("entry.js"), "{json}");
  assert!(inputs.contains_key("dep.js"), "{json}");
  let entry_imports = inputs["entry.js"]["imports"].as_array().unwrap();
  assert_eq!(entry_imports[0]["path"], "dep.js");
  assert_eq!(entry_imports[0]["kind"], "import-statement");
}

#[tokio::test]
async fn metafile_tracks_bytes_in_output() {
  let tester = Tester::from_files(
    &["/entry.js"],
    &[("/entry.js", "console.log('hello')")],
  );
  let mut output = tester.output_options();
  output.metafile = true;
  let mut bundler = fardel_core::Bundler::new(tester.input_options());
  let assets = bundler.generate(output).await.unwrap();
  let meta = assets
    .iter()
    .find(|a| a.filename == "metafile.json")
    .expect("metafile asset");
  let value: serde_json::Value = serde_json::from_str(meta.content_as_str()).unwrap();
  let outputs = value.get("outputs").unwrap().as_object().unwrap();
  let (_, output_meta) = outputs.iter().next().unwrap();
  assert!(output_meta["bytes"].as_u64().unwrap() > 0);
  assert!(output_meta["inputs"]["entry.js"]["bytesInOutput"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn json_objects_expose_named_exports() {
  let tester = Tester::from_files(
    &["/entry.js"],
    &[
      (
        "/entry.js",
        "import { port } from './settings.json'\nconsole.log(port)",
      ),
      ("/settings.json", "{ \"port\": 8080, \"log-level\": \"warn\" }"),
    ],
  );
  let assets = tester.bundle().await.unwrap();
  let code = assets[0].content_as_str();
  assert!(code.contains("const port = 8080;"), "{code}");
  assert!(code.contains("console.log(port);"), "{code}");
  // the unused default object (with its quoted key) tree-shakes away
  assert!(!code.contains("log-level"), "{code}");
}

#[tokio::test]
async fn labeled_loops_survive_bundling() {
  let tester = Tester::from_files(
    &["/entry.js"],
    &[(
      "/entry.js",
      "outer: for (let i = 0; i < 3; i++) {\n  for (let j = 0; j < 3; j++) {\n    if (i + j > 3) break outer\n  }\n}\nconsole.log('done')",
    )],
  );
  let assets = tester.bundle().await.unwrap();
  let code = assets[0].content_as_str();
  assert!(code.contains("outer: for (let i = 0; i < 3; i++) {"), "{code}");
  assert!(code.contains("break outer;"), "{code}");
  assert!(code.contains("console.log(\"done\")") || code.contains("console.log('done')"), "{code}");
}
