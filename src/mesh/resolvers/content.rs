use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::Value;

use super::{ResolveInput, ResolverError, source};
use crate::mesh::MeshContext;
use crate::mesh::sources::SourceRequest;

/// `StoreConfig.announcement`: the current banner text from the
/// `Announcements` source, or `null` when it cannot be fetched.
pub(super) fn announcement(
    ctx: &MeshContext,
    input: ResolveInput,
) -> BoxFuture<'_, Result<Value, ResolverError>> {
    async move {
        let fetched = async {
            let response = source(ctx, "Announcements")?
                .call(SourceRequest::query("announcements", "{announcement}").args_from(&input.args))
                .await?;
            Ok::<_, ResolverError>(response.get("announcement").cloned().unwrap_or(Value::Null))
        }
        .await;

        Ok(fetched.unwrap_or_else(|e| {
            tracing::debug!(error = %e, "announcement unavailable");
            Value::Null
        }))
    }
    .boxed()
}
