//! Model trait for typed collections.

use crate::document::Document;
use crate::error::CoreResult;

/// Trait for types stored in a NeisanDB collection.
///
/// The engine persists [`Document`]s; a `Model` is the typed view the
/// query and mutation APIs hand back. Implementors map between the two
/// and expose the engine-allocated id.
///
/// # Example
///
/// ```rust,ignore
/// use neisandb_core::{CoreError, CoreResult, Document, Model};
///
/// struct User {
///     id: u32,
///     email: String,
///     attempts: i64,
/// }
///
/// impl Model for User {
///     fn id(&self) -> u32 {
///         self.id
///     }
///
///     fn from_document(id: u32, doc: &Document) -> CoreResult<Self> {
///         let email = doc
///             .get("email")
///             .and_then(|v| v.as_text())
///             .ok_or_else(|| CoreError::model_decode("missing email"))?
///             .to_string();
///         let attempts = doc
///             .get("attempts")
///             .and_then(|v| v.as_integer())
///             .unwrap_or(0);
///         Ok(User { id, email, attempts })
///     }
///
///     fn to_document(&self) -> Document {
///         Document::new()
///             .with("email", self.email.clone())
///             .with("attempts", self.attempts)
///     }
/// }
/// ```
pub trait Model: Sized + Send + Sync + 'static {
    /// The engine-allocated id of this instance.
    fn id(&self) -> u32;

    /// Builds an instance from a stored document.
    ///
    /// The document has passed schema validation; failures here mean
    /// the model type and the schema disagree.
    fn from_document(id: u32, doc: &Document) -> CoreResult<Self>;

    /// Renders the instance back into its document form.
    ///
    /// The id is not part of the document; the engine carries it in
    /// the record key.
    fn to_document(&self) -> Document;
}
