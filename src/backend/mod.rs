//! Backend HTTP access: live JSON calls, audit reads and the task stream request.

mod client;

pub use client::BackendClient;
