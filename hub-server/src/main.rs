use hub_server::{print_banner, setup_environment, Server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Environment (dotenv, work directory, logging)
    let config = setup_environment()?;

    print_banner();

    tracing::info!("Laundry Hub Server starting...");

    // 2. Run the HTTP server (initializes state and background tasks)
    let server = Server::new(config);

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
