//! tlm-core: stable foundation for the TLM simulation kernel.
//!
//! Contains:
//! - ids (compact handles for nodes and components)
//! - numeric (finite checks, tolerant comparison, limiters used by components)
//! - naming (collision-free names within a scope)
//! - factory (type-name keyed creator registry)
//! - error (shared error types)

pub mod error;
pub mod factory;
pub mod ids;
pub mod naming;
pub mod numeric;

pub use error::{CoreError, CoreResult};
pub use factory::{ClassFactory, RegisterStatus};
pub use ids::*;
pub use naming::{NameScope, find_unique_name, sanitize_name};
pub use numeric::*;
