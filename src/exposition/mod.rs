pub mod http;
pub mod prometheus;
