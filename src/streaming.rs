use crate::error::ProviderResult;
use crate::models::MessageChunk;
use futures::Stream;
use std::pin::Pin;

/// Finite stream of generated text chunks. Dropping it aborts the underlying request.
pub type MessageStream = Pin<Box<dyn Stream<Item = ProviderResult<MessageChunk>> + Send>>;
