pub mod config;
pub mod directory;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod lookup;
pub mod memory;
pub mod token;
pub mod transport;

pub use config::{CloudEnvironment, DirectoryConfig};
pub use directory::Directory;
pub use envelope::{classify, Envelope, ServiceError};
pub use error::{DirectoryError, TransportError};
pub use filter::Filter;
pub use gateway::GraphDirectory;
pub use memory::InMemoryDirectory;
pub use token::{StaticToken, TokenProvider};
pub use transport::{DirectoryTransport, GraphRequest, GraphResponse, HttpTransport, Verb};

/// Call context carried by every directory operation. Cancelling it aborts
/// the in-flight request.
pub use tokio_util::sync::CancellationToken;
