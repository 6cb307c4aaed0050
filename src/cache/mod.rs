//! Template metadata caching.
//!
//! The template cache is the per-locale inventory of discovered template
//! metadata. [`TemplateCache`] is the in-memory form, replaced wholesale on
//! reload; [`CacheFiles`] owns the on-disk form, including the
//! locale-neutral fallback and clone-on-miss behavior.

pub mod cache;
pub mod files;
pub mod template_info;

pub use cache::TemplateCache;
pub use files::CacheFiles;
pub use template_info::TemplateInfo;
