pub mod ai_sdk;
pub mod protocol;
pub mod schema;
pub mod server;
pub mod stream;
pub mod telemetry;
