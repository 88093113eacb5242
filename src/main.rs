mod api;
mod auth;
mod bridge;
mod cache;
mod error;
mod player;
mod render;
mod tools;
mod types;

use rmcp::ServiceExt;
use rmcp::transport::stdio;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let server = tools::AppleMusicServer::new(None);
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}
