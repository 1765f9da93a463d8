pub mod document;
pub mod field_types;
pub mod index_schema;

pub use document::{Document, DEFAULT_DOCUMENT_TYPE};
pub use field_types::{AllowedValue, FieldDefinition, FieldDefinitions, FilterType};
pub use index_schema::{index_mappings, index_settings};
