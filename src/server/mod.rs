mod connection;
pub mod http_server;
pub mod request;
pub mod response;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{Header, Request};
pub use response::{Reply, Status};
