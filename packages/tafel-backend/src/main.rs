#[tokio::main]
async fn main() {
    if let Err(e) = tafel_backend::run().await {
        log::error!(target: "tafel.startup", "tafel-backend failed: {}", e);
        std::process::exit(1);
    }
}
