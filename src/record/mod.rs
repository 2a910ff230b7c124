pub mod descriptor;
pub mod error;
pub mod patch;
pub mod whitelist;

pub use descriptor::{Descriptor, Field, FieldKind, FieldValue, IDENTIFIER_KEY};
pub use error::RecordError;
pub use patch::{apply_patch, build_record};
pub use whitelist::{parse_batch, parse_object, validate_fields, IdentifierPolicy};

use serde::Serialize;

/// A roster entity stored one row per record in its own table.
///
/// Implementors expose a static [`Descriptor`], built once per type, which
/// drives request validation, patching, SQL generation and row decoding.
pub trait Record: Clone + Default + Serialize + Send + Sync + 'static {
    /// Singular display name used in messages, e.g. "Teacher"
    const LABEL: &'static str;

    fn descriptor() -> &'static Descriptor<Self>;
}
