// a DNS responder for development machines
// every A query, whatever the name, is answered with this machine's address

pub mod address;
pub mod config;
pub mod dns;
pub mod error;
pub mod resolver;
pub mod responder;
pub mod select;
pub mod server;

pub use address::{AddressProvider, AddressSource, SystemSource};
pub use config::{Args, Config};
pub use error::{Error, Result};
pub use responder::Responder;
