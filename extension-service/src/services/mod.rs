pub mod metrics;
pub mod page_source;
pub mod providers;
pub mod session_store;

pub use metrics::{get_metrics, init_metrics};
pub use page_source::{FetchError, PageSource, WikipediaClient};
pub use providers::{ChatProvider, ProviderError};
pub use session_store::SessionMemoryStore;
