pub mod component;
pub mod entity;
pub mod license;
pub mod project;
pub mod purl;
pub mod vulnerability;

pub use component::*;
pub use entity::*;
pub use license::*;
pub use project::*;
pub use purl::{PackageUrl, PurlError};
pub use vulnerability::*;
