pub mod chat_route;
pub mod frontend_route;
pub mod ingest_route;
pub mod status_route;
