use actix::prelude::*;
use anyhow::Context as AnyhowContext;
use askama::Template;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use storefront::api::HttpCatalogApi;
use storefront::config::{self, Config};
use storefront::render::CatalogPage;
use storefront::seo::SeoEmitter;
use storefront::view::{CatalogSnapshot, CatalogView, ChangePage, Navigate, Subscribe};
use tokio::sync::watch;

const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

async fn settle(rx: &mut watch::Receiver<CatalogSnapshot>) -> Result<(), anyhow::Error> {
    tokio::time::timeout(SETTLE_TIMEOUT, rx.wait_for(CatalogSnapshot::is_settled))
        .await
        .context("Timed out waiting for the catalog backend")?
        .context("Catalog view stopped")?;
    Ok(())
}

/// Renders one catalog page: `storefront [category/path] [page]`.
#[actix::main]
async fn main() -> Result<(), anyhow::Error> {
    if let Err(env::VarError::NotPresent) = env::var("RUST_LOG") {
        env::set_var("RUST_LOG", "INFO");
    }
    pretty_env_logger::formatted_timed_builder()
        .parse_default_env()
        .init();

    config::load_dotenv(".env")?;
    let config = Config::from_env()?;

    let mut args = env::args().skip(1);
    let path = args.next().unwrap_or_default();
    let page = args
        .next()
        .map(|p| {
            p.parse::<u32>()
                .with_context(|| format!("Invalid page number {p:?}"))
        })
        .transpose()?;

    log::info!("Using catalog backend {}", config.api_url);
    let api = HttpCatalogApi::new(config.api_url.clone(), &config.locale)?;
    let view = CatalogView::new(Arc::new(api), &config).start();
    let mut subscription = view.send(Subscribe).await?;

    view.send(Navigate(path)).await?;
    settle(&mut subscription.state).await?;

    if let Some(page) = page {
        match view.send(ChangePage(page)).await? {
            Ok(()) => settle(&mut subscription.state).await?,
            Err(err) => log::warn!("{err}"),
        }
    }

    let snapshot = subscription.state.borrow().clone();
    let head = subscription.head.borrow().clone();
    let html = CatalogPage::new(
        &snapshot,
        &head,
        &SeoEmitter::from_config(&config),
        &config.locale,
    )?
    .render()?;
    println!("{html}");
    Ok(())
}
