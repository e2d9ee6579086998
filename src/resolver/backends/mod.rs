// Token service backends

pub mod http;

pub use http::HttpTokenService;
