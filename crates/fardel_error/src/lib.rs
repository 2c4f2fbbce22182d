mod error;
pub use error::*;
mod error_kind;
pub use error_kind::*;
mod errors;
pub use errors::*;
mod diagnostic;
pub use diagnostic::*;
pub use anyhow;
pub use anyhow::format_err;
mod utils;
pub use utils::format_quoted_strings;

pub type Result<T> = std::result::Result<T, Error>;
