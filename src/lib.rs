//! Facade crate: re-exports the bundler core under one roof so embedders
//! depend on a single crate.

pub use fardel_common::Loader;
pub use fardel_core::{
  Asset, Bundle, Bundler, FileNameTemplate, InputItem, InputOptions, Metafile, MinifyOptions,
  ModuleFormat, OutputOptions, Platform, SourceMapMode,
};
pub use fardel_error::{Error, Errors, Location};
pub use fardel_fs::{FileSystem, MemoryFileSystem, OsFileSystem};
pub use fardel_plugin::{BuildPlugin, Context, LoadArgs, ResolveArgs, TransformArgs};

pub type BuildResult<T> = fardel_core::BuildResult<T>;
