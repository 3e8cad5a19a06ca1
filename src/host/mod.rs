//! Host-Side Transport
//!
//! Request/response plumbing towards the control plane and the deployment's
//! data plane endpoints.

pub mod tls;
pub mod transport;

pub use tls::{TlsError, TlsIdentity};
pub use transport::{
    HttpTransport, HttpRequest, HttpResponse, Method, MockTransport, Transport, TransportError,
};
