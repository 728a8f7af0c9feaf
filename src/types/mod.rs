//! Shared value types: request descriptors, parameters, sessions, and serde
//! helpers.

pub mod datetime;
pub mod params;
pub mod request;
pub mod session;

pub use params::{params_from_pairs, ParamValue, Params};
pub use request::{ApiRequest, Method, NoContent, PostEncoding};
pub use session::{BearerSession, TokenGrant};
