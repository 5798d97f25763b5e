pub mod client;
pub mod http;

pub use client::IdentityDirectory;
pub use http::HttpDirectoryClient;
