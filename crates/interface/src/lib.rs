//! gRPC adapter layer between the Catalog transport surface and the
//! application use cases.

pub mod grpc;

pub use grpc::CatalogService;
