//! Domain vocabulary shared by the planner and the executor
//!
//! Content types, properties, literals, serialized remote filters and the
//! catalog seam to the domain-model layer.

mod catalog;
mod filter;
mod literal;
mod property;

pub use catalog::{PropertyCatalog, PropertyDescriptor, StandardCatalog};
pub use filter::{serialize_value, FilterOperator, QueryFilter, TIMESTAMP_FORMAT};
pub use literal::{EnumLiteral, Literal};
pub use property::{
    ContentType, EnumDomain, Priority, Property, PropertyKind, RemoteEnum, Status,
};
