pub mod call;
pub mod executor;
pub mod session;
pub mod transport;

pub use call::{AcceptableSet, CallOutcome, CallSpec};
pub use executor::execute;
pub use session::{Credential, Role, RoleSession};
pub use transport::{HttpRequest, HttpTransport, RawResponse, ReqwestTransport, TransportError};
