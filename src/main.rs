#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();
    std::process::exit(ditto_cli::run().await);
}
