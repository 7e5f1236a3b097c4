//! Identity contract for records stored through the generic repository.

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

/// A domain record with a globally unique identifier.
///
/// The identifier is immutable once assigned and unique within its
/// collection; the repository never changes it. Implementors must serialize
/// the identifier under the document key `_id` (as its canonical string
/// form) so the store's uniqueness constraint applies to it:
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Item {
///     #[serde(rename = "_id")]
///     id: Uuid,
///     // ...
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {
    fn id(&self) -> Uuid;
}
