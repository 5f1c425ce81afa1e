//! Batch Query Helper
//!
//! Some describe operations cap how many identifiers a single call may
//! carry (ECS `describe-services` accepts at most 10). This module splits
//! an arbitrary identifier list into contiguous chunks and issues one
//! gateway call per chunk, merging the records back in chunk order.

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use std::slice::Chunks;

use crate::error::GatewayError;
use crate::gateway::{decode, ProviderGateway};

/// Provider limit on identifiers per describe call
pub const MAX_BATCH_SIZE: usize = 10;

/// Chunks of one list in flight at once
pub const BATCH_CONCURRENCY: usize = 2;

/// Split `ids` into contiguous chunks of at most `size` elements
///
/// Concatenating the chunks reproduces `ids` exactly. A `size` of zero is
/// treated as one.
pub fn partition<T>(ids: &[T], size: usize) -> Chunks<'_, T> {
    ids.chunks(size.max(1))
}

/// Shape of a batched describe call
///
/// Each chunk is sent as `service operation <args...> <ids_flag> <chunk...>`.
#[derive(Debug, Clone)]
pub struct BatchCall<'a> {
    pub service: &'a str,
    pub operation: &'a str,
    pub args: Vec<String>,
    pub ids_flag: &'a str,
}

impl BatchCall<'_> {
    fn args_for(&self, chunk: &[String]) -> Vec<String> {
        let mut args = Vec::with_capacity(self.args.len() + 1 + chunk.len());
        args.extend(self.args.iter().cloned());
        args.push(self.ids_flag.to_string());
        args.extend(chunk.iter().cloned());
        args
    }
}

/// Describe `ids` in chunks of [`MAX_BATCH_SIZE`], decoding each chunk's
/// response as `T` and flattening it into records with `extract`.
///
/// Records come back in chunk order. The first failing chunk (in chunk
/// order) is returned as the error and no further chunks are requested.
pub async fn describe_batched<T, R, F>(
    gateway: &dyn ProviderGateway,
    call: &BatchCall<'_>,
    ids: &[String],
    extract: F,
) -> Result<Vec<R>, GatewayError>
where
    T: DeserializeOwned + Send,
    R: Send,
    F: Fn(T) -> Vec<R> + Sync,
{
    let context = format!("{} {}", call.service, call.operation);
    let context = &context;
    let extract = &extract;

    let chunks: Vec<Vec<String>> = partition(ids, MAX_BATCH_SIZE)
        .map(<[String]>::to_vec)
        .collect();
    let per_chunk: Vec<Vec<R>> = stream::iter(chunks)
        .map(|chunk| async move {
            let response = gateway
                .call(call.service, call.operation, &call.args_for(&chunk))
                .await?;
            decode::<T>(response, context).map(extract)
        })
        .buffered(BATCH_CONCURRENCY)
        .try_collect()
        .await?;

    Ok(per_chunk.into_iter().flatten().collect())
}
