//! Standard listener implementations.

pub mod api;
pub mod logging;
pub mod redirect;

pub use api::ApiListener;
pub use logging::LoggingListener;
pub use redirect::RedirectListener;
