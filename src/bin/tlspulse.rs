use tlspulse::cli::start;

#[tokio::main]
async fn main() {
    if let Err(err) = start().await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
