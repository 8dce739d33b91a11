//! C4: the app server wrapper (spec.md §4.4, §6).

pub mod axum_ws;
pub mod transport;
pub mod wrapper;

pub use axum_ws::AxumTransport;
pub use transport::Transport;
pub use wrapper::SessionServer;
