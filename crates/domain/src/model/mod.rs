mod call;
mod interaction_log;
mod provider;
mod recommendation;
mod service_request;

pub use call::*;
pub use interaction_log::*;
pub use provider::*;
pub use recommendation::*;
pub use service_request::*;
