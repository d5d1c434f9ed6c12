pub mod connectivity;
pub mod durable_store;
pub mod http_transport;

pub use connectivity::ConnectivityObserver;
pub use durable_store::DurableStore;
pub use http_transport::{DeliveryRequest, HttpTransport, TransportResponse};
