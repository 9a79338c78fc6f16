//! Exclusive read-modify-write cycles.

use serde_json::Value;

use crate::error::StoreResult;
use crate::kind::DocumentKind;
use crate::serializer::WriteSerializer;
use crate::storage::{DocumentKey, DocumentStore};

/// Serializer key for account mutations. `identity` is whatever the request
/// layer resolved for the current caller.
pub fn resource_key_for_account(identity: &str) -> String {
    DocumentKey::new(DocumentKind::Account, identity).to_string()
}

/// Reads `key`, applies `mutate`, writes the result back, all under the
/// serializer lock for `key`. A missing document starts from `default()`.
///
/// Nothing is written when `mutate` fails.
pub async fn update_document<R, D, F>(
    store: &dyn DocumentStore,
    serializer: &WriteSerializer,
    key: &DocumentKey,
    default: D,
    mutate: F,
) -> StoreResult<R>
where
    D: FnOnce() -> Value,
    F: FnOnce(&mut Value) -> StoreResult<R>,
{
    serializer
        .run_exclusive(&key.to_string(), || async move {
            let mut document = match store.read(key).await {
                Ok(document) => document,
                Err(error) if error.is_not_found() => default(),
                Err(error) => return Err(error),
            };
            let outcome = mutate(&mut document)?;
            store.write(key, &document).await?;
            Ok(outcome)
        })
        .await
}

/// [`update_document`] for the account owned by `identity`.
pub async fn update_account<R, F>(
    store: &dyn DocumentStore,
    serializer: &WriteSerializer,
    identity: &str,
    mutate: F,
) -> StoreResult<R>
where
    F: FnOnce(&mut Value) -> StoreResult<R>,
{
    let key = DocumentKey::new(DocumentKind::Account, identity);
    update_document(store, serializer, &key, || Value::Object(Default::default()), mutate).await
}
