pub mod http;
pub mod todos;

pub use http::{app, AppState, HttpServer, HttpServerConfig};
pub use todos::todo_routes;
