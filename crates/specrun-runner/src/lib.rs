//! specrun-runner: drives a live server through conformance scenarios

pub mod executor;
pub mod transport;

pub use executor::{Executor, RunError};
pub use transport::{OutgoingRequest, ReqwestTransport, Transport, TransportError, TransportResponse};
