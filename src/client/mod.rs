//! C5: the session client (spec.md §4.5).

pub mod reconnect;
pub mod state;
pub mod ws;

pub use reconnect::ReconnectPolicy;
pub use state::{ConnectionState, EventSink, SessionClient};

use crate::contract::schema::AppSchema;
use crate::error::ClientError;

impl<E, S> SessionClient<E, S>
where
    S: AppSchema,
    E: EventSink<S> + 'static,
{
    /// spec.md §4.5 `connect`.
    pub async fn connect(&self, url: &str) -> Result<(), ClientError> {
        ws::connect(self, url).await
    }
}
