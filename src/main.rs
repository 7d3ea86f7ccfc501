use clap::Parser;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::sync::Notify;

mod app;
mod cli;
mod config;
mod handler;
mod http;
mod logger;
mod routing;
mod server;

use cli::{Cli, Command};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cfg = config::Config::load_from(&cli.config)?;
    let app = app::create_app(Some(&cfg.app))?;

    if cli.command.unwrap_or_default() == Command::Routes {
        print!("{}", cli::render_routes(app.routes()));
        return Ok(());
    }

    logger::init(&cfg.logging)?;

    // 创建 Tokio 运行时，根据 workers 配置设置线程数
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg, app))
}

async fn async_main(cfg: config::Config, app: app::App) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_listener(addr)?;
    logger::log_server_start(&addr, &cfg, &app);

    let state = Arc::new(config::AppState::new(cfg, app));
    let shutdown = Arc::new(Notify::new());
    server::start_signal_handler(Arc::clone(&shutdown));

    server::start_server_loop(listener, state, Arc::new(AtomicUsize::new(0)), shutdown).await;
    tracing::info!("server stopped");
    Ok(())
}
