pub mod auth;
pub mod config;
pub mod error;
pub mod module;
pub mod page;
pub mod types;

pub use auth::{Requester, Viewer};
pub use config::ServiceConfig;
pub use error::ServiceError;
pub use module::Module;
pub use page::{Page, PageQuery, SortOrder, DEFAULT_LIMIT, MAX_LIMIT};
pub use types::{is_blank, new_id, now_rfc3339};
