//! REST backend of the session layer: credential storage, the authenticated
//! request dispatcher and the typed endpoints built on top of it.

pub mod api;
pub mod dispatcher;
mod jwt;
pub mod session;
pub mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;

pub use api::{Api, FieldErrors};
pub use dispatcher::{DecodeError, DispatchError, Dispatcher, Reply};
pub use jwt::ClaimsError;
pub use session::Session;
pub use store::{FileStore, MemoryStore};
pub use transport::SurfTransport;
