use anyhow::Context;
use db::DBService;
use server::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;
use utils::jwt::TokenKeys;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:care_track.db".to_string());
    let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3001".to_string())
        .parse()
        .context("PORT must be a number")?;

    let db = DBService::new(&database_url).await?;
    let state = AppState {
        db,
        token_keys: TokenKeys::from_secret(jwt_secret.as_bytes()),
    };

    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, server::router(state)).await?;

    Ok(())
}
