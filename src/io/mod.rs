// Adapters between the enhancer and the outside world: HTTP, object storage and image codecs.

pub mod codec;
pub mod fetch;
pub mod object_store;
