use std::{borrow::Cow, fmt::Debug};

use fardel_common::Loader;

use crate::{Context, LoadArgs, ResolveArgs, TransformArgs};

#[derive(Debug)]
pub struct ResolvedId {
  pub id: String,
  pub external: bool,
  pub namespace: Option<String>,
}

#[derive(Debug)]
pub struct LoadedSource {
  pub code: String,
  pub loader: Option<Loader>,
}

pub type ResolveOutput = fardel_error::Result<Option<ResolvedId>>;
pub type LoadOutput = fardel_error::Result<Option<LoadedSource>>;
pub type TransformOutput = fardel_error::Result<Option<String>>;
pub type PluginName<'a> = Cow<'a, str>;

/// User-supplied build hooks. The driver asks each plugin in order and takes
/// the first non-`None` answer; hooks run while the core holds no locks.
#[async_trait::async_trait]
pub trait BuildPlugin: Debug + Send + Sync {
  fn name(&self) -> PluginName;

  async fn resolve(&self, _ctx: &mut Context, _args: &mut ResolveArgs<'_>) -> ResolveOutput {
    Ok(None)
  }

  async fn load(&self, _ctx: &mut Context, _args: &mut LoadArgs<'_>) -> LoadOutput {
    Ok(None)
  }

  async fn transform(&self, _ctx: &mut Context, _args: &mut TransformArgs<'_>) -> TransformOutput {
    Ok(None)
  }
}
