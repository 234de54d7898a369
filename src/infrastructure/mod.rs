//! External integrations: scanner adapters, threat-intel feeds and
//! repository implementations

pub mod adapters;
pub mod feeds;
pub mod repositories;
