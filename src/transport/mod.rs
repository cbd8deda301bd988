mod error_message;
mod http_transport;
mod upstream;

pub use error_message::{format_upstream_error, upstream_http_error};
pub use http_transport::HttpTransport;
pub use upstream::{ByteStream, UpstreamResponse};
