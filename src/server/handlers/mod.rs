//! Route handlers and entity descriptors

pub mod clients;
pub mod crud;
pub mod events;
pub mod insights;
pub mod invoices;
pub mod products;

pub use clients::ClientDescriptor;
pub use crud::{CrudDescriptor, Managed};
pub use invoices::InvoiceDescriptor;
pub use products::ProductDescriptor;
