//! URL handling module
//!
//! Host extraction, same-site matching, and the safety filter applied to
//! every candidate link before it is fetched.

mod domain;
mod matcher;
mod safety;

pub use domain::{extract_domain, host_key};
pub use matcher::is_same_site;
pub use safety::{is_private_ip, is_safe, LinkFilter};
