//! Read-path query handling
//!
//! Request parameter decoding, search execution and the pagination envelope
//! returned by `GET /search`.

pub mod paging;
pub mod params;
pub mod search;

pub use paging::{paginate, PagingEnvelope};
pub use params::{decode_params, ParamError, QueryParams, DEFAULT_LIMIT, MAX_LIMIT};
pub use search::{build_query, search, QueryError, SearchPage};
