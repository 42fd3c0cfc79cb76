//! API data models.
//!
//! The service keeps no database; these types only describe what travels
//! over HTTP and serialize as camelCase JSON via `serde`.

pub mod object;
pub mod response;
