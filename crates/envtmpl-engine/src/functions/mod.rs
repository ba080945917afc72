//! Bundled template functions
//!
//! Arguments follow the pipeline convention: the data being transformed is
//! always the last argument, so `{{ "x" | hash("sha256") }}` and
//! `{{ hash("sha256", "x") }}` are the same call.

mod bound;
mod encoding;
mod hash;
mod misc;
mod slugify;
mod text;
mod url;

use crate::error::RegistryError;
use crate::registry::Registry;

pub use self::bound::{FileFn, GetFn, IncludeFn, SetFn};
pub use self::hash::HashAlgorithm;
pub use self::slugify::NormalizationForm;
pub use self::url::UrlValue;

/// Register every bundled function
pub fn register_builtins(registry: &mut Registry) -> Result<(), RegistryError> {
    text::register(registry)?;
    encoding::register(registry)?;
    hash::register(registry)?;
    slugify::register(registry)?;
    url::register(registry)?;
    misc::register(registry)?;
    bound::register(registry)?;
    Ok(())
}
