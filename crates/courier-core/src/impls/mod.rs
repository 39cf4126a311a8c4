//! Implementations of the ports.

pub mod inmem_transport;

pub use self::inmem_transport::InMemoryTransport;
