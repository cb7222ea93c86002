//! Helper functions for building page data
//!
//! Date display and URL generation shared by the generator and the server.

mod date;
mod url;

pub use self::date::*;
pub use self::url::*;
