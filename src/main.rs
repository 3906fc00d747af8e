use anyhow::{anyhow, Context};
use log::{error, info};
use mimalloc::MiMalloc;
use std::net::{IpAddr, SocketAddr, TcpListener};
use std::path::Path;

use photo_gallery::config::{self, Config};
use photo_gallery::db;
use photo_gallery::routes::build_routes;
use photo_gallery::storage::Storage;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() {
    // Before the logger, so RUST_LOG may come from the file
    let env_file = config::load_env_file(Path::new(".env"));
    env_logger::init();

    match env_file {
        Ok(true) => info!("Loaded environment from .env"),
        Ok(false) => {}
        Err(e) => {
            error!("Could not read .env: {}", e);
            std::process::exit(1);
        }
    }

    if let Err(e) = run().await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env().map_err(|e| anyhow!("Invalid configuration: {}", e))?;

    info!("Starting photo gallery on {}:{}", config.host, config.port);
    info!("Database: {}", config.database_url);
    info!("Uploads: {:?}", config.uploads_dir);
    info!("Upload limit: {} bytes", config.max_upload_bytes);

    let ip: IpAddr = config
        .host
        .parse()
        .with_context(|| format!("Invalid HOST {:?}", config.host))?;
    let addr = SocketAddr::new(ip, config.port);

    // Check the port before touching the database or the uploads directory
    if !is_port_available(addr) {
        error!(
            "You can check what's using the port with: lsof -i :{}",
            config.port
        );
        return Err(anyhow!("Port {} is already in use", config.port));
    }

    let db_pool = db::create_db_pool(&config.database_url)
        .await
        .context("Database initialization failed")?;
    info!("Database initialized successfully");

    let storage = Storage::new(config.uploads_dir.clone());
    storage
        .prepare()
        .await
        .with_context(|| format!("Could not create upload directories under {:?}", storage.root()))?;

    let routes = build_routes(db_pool, storage, config.max_upload_bytes);

    info!("Server started successfully, listening on http://{}", addr);

    warp::serve(routes).run(addr).await;

    Ok(())
}

fn is_port_available(addr: SocketAddr) -> bool {
    TcpListener::bind(addr).is_ok()
}
