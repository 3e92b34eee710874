//! Procedural macros for `fitdash`.

mod record;

use proc_macro::TokenStream;

/// Derive macro for records stored in a `fitdash::PersistedCollection`.
///
/// ```ignore
/// #[derive(Clone, Debug, Serialize, Deserialize, Record)]
/// #[record(slot = "members")]
/// pub struct Member {
///     pub id: RecordId,
///     pub name: String,
///     #[record(default)]
///     pub status: MemberStatus,
/// }
/// ```
///
/// Generates `MemberDraft` (every field but the id; `#[record(default)]`
/// fields become optional and fall back to `Default::default()`) and
/// `MemberPatch` (every field but the id, all optional).
///
/// - `#[record(slot = "...")]` names the storage slot.
///   If omitted, defaults to snake_case struct name + "s".
/// - `#[record(id)]` marks the identifier field.
///   If omitted, defaults to a field named `id`.
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    record::derive_record(input)
}
