//! Connection requests between users: the record model, its status machine,
//! the storage ports and the service that ties them together.

pub mod error;
pub mod memory;
pub mod model;
pub mod repository;
pub mod service;
pub mod status;

pub use error::{RepositoryError, ServiceError};
pub use model::{Connection, IncomingRequest, UserPair, UserSummary};
pub use repository::{ConnectionRepository, UserDirectory};
pub use service::{RequestService, ReviewedRequest, SentRequest};
pub use status::ConnectionStatus;
