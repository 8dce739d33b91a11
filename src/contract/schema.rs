//! Wire-format abstraction (teacher: `api::schema`).
//!
//! A [`Schema`] names a wire format; [`Serialize`]/[`Deserialize`] bind a
//! Rust type to that format. The crate ships one schema,
//! [`Json`](crate::contract::json::Json), but application code never has
//! to depend on it directly — `AppSchema` is the bound the session
//! runtime and client actually require.

use crate::error::ClientError;

/// Names a wire format. Framework code is generic over `S: Schema` so a
/// consumer can swap in a binary schema without touching the runtime.
pub trait Schema {
    fn schema_type() -> SchemaType;
}

pub enum SchemaType {
    Text,
    Binary,
}

pub trait Serialize<S: Schema> {
    fn serialize(&self) -> Vec<u8>;
}

pub trait Deserialize<S: Schema>: Sized {
    fn deserialize(buf: &[u8]) -> Result<Self, ClientError>;
}

/// The payload schemas an application supplies, per spec.md §4.1
/// Composition rule B. A session is generic over exactly one `AppSchema`
/// implementation for its entire lifetime.
pub trait AppSchema: Send + Sync + 'static {
    type Wire: Schema;
    /// The app's own client->server message union (Composition rule A).
    type ClientMessage: Serialize<Self::Wire> + Deserialize<Self::Wire> + Send + 'static;
    /// Opaque payload nested inside `welcome.appData`. `Deserialize` lets
    /// [`crate::client::SessionClient`] decode it on receipt.
    type WelcomeData: Serialize<Self::Wire> + Deserialize<Self::Wire> + Send + 'static;
    /// Opaque payload nested inside `opponent_joined.appData`.
    type OpponentJoinedData: Serialize<Self::Wire> + Deserialize<Self::Wire> + Send + 'static;
    /// Opaque payload nested inside `session_reset.appData`.
    type ResetData: Serialize<Self::Wire> + Deserialize<Self::Wire> + Send + 'static;
    /// Opaque payload nested inside `session_ended.appData`.
    type EndedData: Serialize<Self::Wire> + Deserialize<Self::Wire> + Send + 'static;
    /// Any other server->client message the app defines, shipped through
    /// unchanged (spec.md §4.1 Composition rule B, final sentence).
    type ServerMessage: Serialize<Self::Wire> + Deserialize<Self::Wire> + Send + 'static;
}
