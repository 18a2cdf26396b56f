mod drivers;
mod traits;

pub use drivers::http::{HttpConfig, HttpTransport};
pub use traits::{Transport, TransportError};
