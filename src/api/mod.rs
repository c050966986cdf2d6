pub mod client;
pub mod transport;

#[cfg(test)]
pub mod testing;

pub use client::{ApiClient, TokenGrant, TokenRefresher};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport};
