//! Blog module: posts, threaded comments, polls, likes, follows,
//! notifications and search.
//!
//! # Resources
//!
//! - **Post** with tags and an optional poll
//! - **Comment** threaded through `parent_id`; deleting one removes its replies
//! - **Like** one like or dislike per user per post
//! - **Follow** directed user relation
//! - **Notification** per recipient, with a read flag
//!
//! Every list endpoint pages by cursor (see [`blog_core::page`]).
//!
//! # Usage
//!
//! ```ignore
//! use blog::BlogModule;
//!
//! let module = BlogModule::new(sql)?;
//! let router = module.routes(); // Mount under /blog
//! ```

pub mod api;
pub mod model;
pub mod service;
pub mod thread;

use std::sync::Arc;

use axum::Router;
use tracing::info;

use blog_core::{Module, ServiceError};
use blog_sql::SQLStore;

use crate::service::BlogService;

/// Blog module implementing the Module trait.
pub struct BlogModule {
    service: Arc<BlogService>,
}

impl BlogModule {
    /// Create the module, initializing its schema in `sql`.
    pub fn new(sql: Arc<dyn SQLStore>) -> Result<Self, ServiceError> {
        let service = BlogService::new(sql).map_err(ServiceError::from)?;
        info!("blog module ready");
        Ok(Self { service })
    }

    pub fn service(&self) -> &Arc<BlogService> {
        &self.service
    }
}

impl Module for BlogModule {
    fn name(&self) -> &str {
        "blog"
    }

    fn routes(&self) -> Router {
        api::build_router(self.service.clone())
    }
}
