pub mod http_method;
pub mod operation_id;
pub mod operation_status;
pub mod priority;
pub mod region;

pub use http_method::HttpMethod;
pub use operation_id::OperationId;
pub use operation_status::OperationStatus;
pub use priority::Priority;
pub use region::StoreRegion;
