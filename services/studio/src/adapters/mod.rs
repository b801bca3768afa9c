pub mod credentials;
pub mod http;

pub use credentials::{StaticTokenProvider, TokenFileProvider};
pub use http::HttpRemoteCaller;
