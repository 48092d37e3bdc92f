//! Domain values decoded from engine responses, and the typed request bodies
//! sent back to it.

mod container;
mod image;
mod network;

use std::collections::BTreeMap;

pub use container::*;
pub use image::*;
pub use network::*;

/// Engine list filters, sent as the JSON-encoded `filters` query parameter
/// (`{"label": ["tier=db"], "status": ["running"]}`).
pub type Filters = BTreeMap<String, Vec<String>>;
