// Cashback messaging between the background and other contexts
// protocol - wire types, router - background handlers, proxy - content-script client

pub mod protocol;
pub mod proxy;
pub mod router;

pub use protocol::{Notification, Request, RequestKind, Response};
pub use proxy::{RemoteProxy, Transport};
pub use router::{MessageRouter, Reply};
