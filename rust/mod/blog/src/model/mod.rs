mod comment;
mod follow;
mod notification;
mod poll;
mod post;
mod query;
mod search;
mod user;

pub use comment::*;
pub use follow::*;
pub use notification::*;
pub use poll::*;
pub use post::*;
pub use query::*;
pub use search::*;
pub use user::*;
