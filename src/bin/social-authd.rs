use clap::Parser;

#[tokio::main]
async fn main() -> Result<(), social_auth::auth::error::Error> {
    use social_auth::util::cli::*;

    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let opts = Options::parse();
    run(opts).await
}
