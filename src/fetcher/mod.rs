pub mod chunks;
pub mod interactions;
pub mod listener;

pub use interactions::{FetchOptions, InteractionFetcher};
pub use listener::{EventCallback, EventListener, ListenerHandle};
