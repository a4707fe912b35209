//! Data models shared by the API client, report driver and web UI

mod profile;
mod table;

pub use profile::*;
pub use table::*;
