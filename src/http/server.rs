use std::{net::SocketAddr, pin::pin, sync::Arc, time::Duration};

use axum::{extract::ConnectInfo, middleware, routing::get, Extension, Router};
use hyper_util::{
    rt::{TokioExecutor, TokioIo, TokioTimer},
    server::{conn::auto, graceful::GracefulShutdown},
    service::TowerToHyperService,
};
use log::{debug, info, warn};
use thiserror::Error;
use tokio::{io, net::TcpListener, sync::Semaphore};
use tower::ServiceBuilder;

use crate::{
    http::{access_log, config, handlers::index},
    params::Limits,
    random::SeedSource,
    shutdown::ShutdownSignal,
};

const LOG_TARGET: &str = "trickle::server";
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// The HTTP server hosting the streaming endpoint.
pub struct HttpServer {
    shutdown_signal: ShutdownSignal,
    config: config::Config,
    seeds: Arc<SeedSource>,
    slots: Arc<Semaphore>,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    IO(#[from] io::Error),
}

#[derive(Clone)]
pub struct AppState {
    pub limits: Limits,
    pub write_timeout: Duration,
    pub seeds: Arc<SeedSource>,
    /// One permit per response being streamed, held until its body ends.
    pub slots: Arc<Semaphore>,
}

impl HttpServer {
    pub fn new(shutdown_signal: ShutdownSignal, config: config::Config, seeds: SeedSource) -> Self {
        let slots = Arc::new(Semaphore::new(config.max_connections));
        Self {
            shutdown_signal,
            config,
            seeds: Arc::new(seeds),
            slots,
        }
    }

    pub fn routes(&self) -> Router {
        let router = Router::new()
            .route("/", get(index::handle_index))
            .with_state(AppState {
                limits: self.config.limits,
                write_timeout: self.config.write_timeout,
                seeds: self.seeds.clone(),
                slots: self.slots.clone(),
            });

        router.layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(access_log::log_request))
                .into_inner(),
        )
    }

    pub async fn bind(&self) -> Result<TcpListener, Error> {
        let listener = TcpListener::bind(self.config.listen_addr).await?;
        info!(target: LOG_TARGET, "HTTP listener bound to {:?}", listener.local_addr());
        Ok(listener)
    }

    fn connection_builder(&self) -> auto::Builder<TokioExecutor> {
        let mut builder = auto::Builder::new(TokioExecutor::new());
        // hyper arms this timer whenever it waits for a request head, so it
        // bounds both a slow head and an idle keep-alive connection.
        builder
            .http1()
            .timer(TokioTimer::new())
            .keep_alive(true)
            .header_read_timeout(self.config.read_timeout);
        builder
    }

    /// Serves until the shutdown signal fires and every open connection has
    /// finished.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), Error> {
        info!(
            target: LOG_TARGET,
            "Read/idle timeout: {:?}, Write timeout: {:?}, Max connections: {}",
            self.config.read_timeout,
            self.config.write_timeout,
            self.config.max_connections
        );

        let router = self.routes();
        let builder = self.connection_builder();
        let graceful = GracefulShutdown::new();
        let mut shutdown = pin!(self.shutdown_signal.clone().wait());

        loop {
            let (stream, remote) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(target: LOG_TARGET, "Failed to accept connection: {}", e);
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    },
                },
                _ = &mut shutdown => break,
            };

            let service = TowerToHyperService::new(router.clone().layer(Extension(ConnectInfo::<SocketAddr>(remote))));
            let conn = builder.serve_connection(TokioIo::new(stream), service);
            let conn = graceful.watch(conn.into_owned());
            tokio::spawn(async move {
                if let Err(e) = conn.await {
                    debug!(target: LOG_TARGET, "Connection from {} ended with error: {}", remote, e);
                }
            });
        }

        drop(listener);
        info!(target: LOG_TARGET, "No longer accepting connections, draining in-flight requests");
        graceful.shutdown().await;

        info!(target: LOG_TARGET, "HTTP server stopped gracefully");
        Ok(())
    }
}
