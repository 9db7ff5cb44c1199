//! Generated Protocol Buffer types for the catalog service.
//!
//! This crate contains the Rust types generated from `library.proto`:
//! message structs plus the `Catalog` gRPC client and server traits.
//! Service implementations live in `catalog-interface`.

include!("generated/catalog.v1.rs");

/// File descriptor set for gRPC reflection.
pub const FILE_DESCRIPTOR_SET: &[u8] = include_bytes!("generated/catalog_descriptor.bin");
