//! Synthetic test data
//!
//! - [`field`]: field kind inference from names and value generators
//! - [`form`]: JSON rows for online form schemas
//! - [`sheet`]: xlsx workbooks for file collection templates
//! - [`files`]: sample attachment files

pub mod field;
pub mod files;
pub mod form;
pub mod sheet;

pub use field::FieldKind;
pub use files::{SampleFiles, SampleKind};
pub use form::FormDataGenerator;
pub use sheet::SheetGenerator;
