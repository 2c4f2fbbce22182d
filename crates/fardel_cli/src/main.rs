use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use fardel_core::{
  Bundler, FileNameTemplate, InputItem, InputOptions, ModuleFormat, OutputOptions,
};
use fardel_fs::{FileSystem, OsFileSystem};
use fardel_resolver::AmdConfig;

mod args;
mod diagnostics;

use args::{parse_args, CliArgs, Command};

fn main() -> ExitCode {
  let os_args: Vec<String> = std::env::args().skip(1).collect();
  let args = match parse_args(&os_args) {
    Ok(args) => args,
    Err(err) => {
      diagnostics::report_error(&err, true);
      return ExitCode::from(1);
    }
  };

  let runtime = tokio::runtime::Builder::new_multi_thread()
    .enable_all()
    .build()
    .expect("tokio runtime");

  let result = runtime.block_on(run(&args));
  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(errors) => {
      diagnostics::report_errors(&errors, args.error_limit, true);
      ExitCode::from(1)
    }
  }
}

async fn run(args: &CliArgs) -> Result<(), fardel_error::Errors> {
  match args.command {
    Command::Transform => transform(args).map_err(Into::into),
    Command::Analyse => analyse(args).await,
    Command::Build => build(args).await,
  }
}

fn input_options(args: &CliArgs) -> Result<InputOptions, fardel_error::Error> {
  let cwd = std::env::current_dir().map_err(fardel_error::Error::io_error)?;
  let fs: Arc<dyn FileSystem> = Arc::new(OsFileSystem::new(cwd.clone()));

  let amd_config = match &args.amdconfig {
    Some(path) => {
      let source = fs
        .read_to_string(path)
        .map_err(fardel_error::Error::io_error)?;
      Some(AmdConfig::parse(&source)?)
    }
    None => None,
  };

  Ok(InputOptions {
    input: args
      .entries
      .iter()
      .map(|entry| InputItem {
        name: None,
        import: entry.clone(),
      })
      .collect(),
    cwd,
    treeshake: !args.no_treeshake,
    platform: args.platform,
    fs,
    external: args.external.clone(),
    define: args.define.clone().into_iter().collect(),
    pure_functions: args.pure_functions.clone(),
    loaders: args.loaders.clone(),
    inject: args.inject.clone(),
    resolve_extensions: args.resolve_extensions.clone(),
    main_fields: args.main_fields.clone(),
    tsconfig: args.tsconfig.clone(),
    amd_config,
    error_limit: args.error_limit,
    ..Default::default()
  })
}

fn output_options(args: &CliArgs) -> OutputOptions {
  let entry_template = match &args.outfile {
    Some(outfile) => {
      let name = Path::new(outfile)
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "[name].js".to_string());
      FileNameTemplate::new(name)
    }
    None => FileNameTemplate::new("[name].js".to_string()),
  };
  OutputOptions {
    format: args.format.unwrap_or(ModuleFormat::Esm),
    splitting: args.splitting,
    global_name: args.global_name.clone(),
    entry_file_names: entry_template,
    chunk_file_names: FileNameTemplate::new("[name].js".to_string()),
    sourcemap: args.sourcemap,
    minify: args.minify,
    banner: args.banner.clone(),
    footer: args.footer.clone(),
    public_path: args.public_path.clone(),
    out_extensions: args.out_extensions.clone(),
    metafile: args.metafile.is_some(),
    ..Default::default()
  }
}

async fn build(args: &CliArgs) -> Result<(), fardel_error::Errors> {
  let input = input_options(args).map_err(fardel_error::Errors::from)?;
  let output = output_options(args);
  let mut bundler = Bundler::new(input);

  let out_dir = match (&args.outfile, &args.outdir) {
    (Some(outfile), _) => Path::new(outfile)
      .parent()
      .map(|p| p.to_string_lossy().to_string())
      .filter(|p| !p.is_empty()),
    (None, Some(outdir)) => Some(outdir.clone()),
    (None, None) => None,
  };

  let assets = match &out_dir {
    Some(dir) => bundler.write(output, Some(dir.clone())).await?,
    None => {
      // no output path: print the single bundle to stdout
      let assets = bundler.generate(output).await?;
      for asset in &assets {
        print!("{}", asset.content_as_str());
      }
      return Ok(());
    }
  };

  let mut written: Vec<(String, usize)> = assets
    .iter()
    .map(|asset| {
      let dir = out_dir.clone().unwrap_or_default();
      let path = if dir.is_empty() {
        asset.filename.clone()
      } else {
        format!("{dir}/{}", asset.filename)
      };
      (path, asset.content.len())
    })
    .collect();
  written.sort();
  diagnostics::summarize_written(&written);

  if let Some(metafile_path) = &args.metafile {
    if let Some(asset) = assets.iter().find(|a| a.filename == "metafile.json") {
      std::fs::write(metafile_path, &asset.content)
        .map_err(|e| fardel_error::Errors::from(fardel_error::Error::io_error(e)))?;
    }
  }
  Ok(())
}

async fn analyse(args: &CliArgs) -> Result<(), fardel_error::Errors> {
  let input = input_options(args).map_err(fardel_error::Errors::from)?;
  let mut bundler = Bundler::new(input);
  let json = bundler.analyse().await?;
  match &args.metafile {
    Some(path) => std::fs::write(path, json)
      .map_err(|e| fardel_error::Errors::from(fardel_error::Error::io_error(e)))?,
    None => println!("{json}"),
  }
  Ok(())
}

/// Single-file, no-resolve pipeline: parse and reprint one module.
fn transform(args: &CliArgs) -> Result<(), fardel_error::Error> {
  let entry = &args.entries[0];
  let source =
    std::fs::read_to_string(entry).map_err(fardel_error::Error::io_error)?;

  let module = fardel_syntax::Parser::new(entry, &source)?.parse_module()?;
  let mut printer = fardel_syntax::Printer::new(
    fardel_syntax::PrintOptions {
      minify_whitespace: args.minify.whitespace,
    },
    None,
  );
  for (index, stmt) in module.body.iter().enumerate() {
    if index > 0 {
      printer.hard_newline();
    }
    printer.print_stmt(stmt, &fardel_syntax::VerbatimResolver);
  }
  let mut code = printer.finish();
  code.push('\n');
  if let Some(banner) = &args.banner {
    code = format!("{banner}\n{code}");
  }
  if let Some(footer) = &args.footer {
    code.push_str(footer);
    code.push('\n');
  }

  match &args.outfile {
    Some(outfile) => {
      if let Some(parent) = PathBuf::from(outfile).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
          std::fs::create_dir_all(parent).map_err(fardel_error::Error::io_error)?;
        }
      }
      std::fs::write(outfile, code).map_err(fardel_error::Error::io_error)?;
    }
    None => print!("{code}"),
  }
  Ok(())
}
