//! Single-observation probes. Each invocation issues one query and classifies it.

pub mod bucket;
pub mod control_plane;
pub mod kubernetes;

pub use bucket::objects_absent;
pub use control_plane::*;
pub use kubernetes::*;
