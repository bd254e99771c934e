//! Live content for a connection.
//!
//! The content manager regenerates the page behind the session's content
//! path whenever the path changes (or the fallback interval passes) and
//! pushes it to the client as a `content` event. A module answering
//! "not found" sends the session to the parent path, and the manager
//! regenerates within the same activation.

mod filters;
mod generator;
mod manager;
mod requests;

pub use filters::{filters_from_query_params, filters_to_label_set, FilterError};
pub use generator::{
    not_found_redirect_path, ContentGenerator, Generation, ModuleContentGenerator,
    DEFAULT_CONTENT_PREFIX,
};
pub use manager::{ContentManager, ContentManagerBuilder, DEFAULT_MAX_REDIRECTS};
pub use requests::{
    set_content_path, set_namespace, set_query_params, REQUEST_SET_CONTENT_PATH,
    REQUEST_SET_NAMESPACE, REQUEST_SET_QUERY_PARAMS,
};

use thiserror::Error;

use crate::module::ModuleError;
use crate::payload::PayloadError;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("unable to find module for content path {0:?}")]
    NoModule(String),

    #[error("generate content: {0}")]
    Module(#[source] ModuleError),

    #[error("redirect loop at content path {path:?} after {hops} redirects")]
    RedirectLoop { path: String, hops: usize },

    #[error("content path {path:?} exceeded the limit of {limit} redirects")]
    TooManyRedirects { path: String, limit: usize },

    #[error("extract {field} from payload: {source}")]
    Payload {
        field: &'static str,
        #[source]
        source: PayloadError,
    },

    #[error("extract filters from query params: {0}")]
    Filters(#[from] FilterError),
}
