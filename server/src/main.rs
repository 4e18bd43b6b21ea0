#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();
    let config = rolodex_server::config::Config::from_env()?;
    rolodex_server::web::start_web_server(config).await
}
