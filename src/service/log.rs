use env_logger::Builder;
use colored::Colorize;
use log::{Level, info, warn};
use std::io::Write;
use std::time::Instant;
use std::future::{ready, Ready};
use actix_web::{
   dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
   Error,
};
use futures_util::future::LocalBoxFuture;

/// Logs the request line on the way in and status plus latency on the way out.
pub struct LoggerMiddleware;

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
   S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
   S::Future: 'static,
   B: 'static,
{
   type Response = ServiceResponse<B>;
   type Error = Error;
   type InitError = ();
   type Transform = LoggerMiddlewareService<S>;
   type Future = Ready<Result<Self::Transform, Self::InitError>>;

   fn new_transform(&self, service: S) -> Self::Future {
      ready(Ok(LoggerMiddlewareService { service }))
   }
}

pub struct LoggerMiddlewareService<S> {
   service: S
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
   type Response = ServiceResponse<B>;
   type Error = Error;
   type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

   forward_ready!(service);

   fn call(&self, req: ServiceRequest) -> Self::Future {
      let line = format!("{} {}", req.method(), req.path());
      info!("--> {}", line);
      let started = Instant::now();
      let fut = self.service.call(req);

      Box::pin(async move {
         let res = fut.await?;
         let status = res.status();
         let elapsed = started.elapsed().as_millis();
         if status.is_server_error() {
            warn!("<-- {} {} ({} ms)", line, status, elapsed);
         } else {
            info!("<-- {} {} ({} ms)", line, status, elapsed);
         }
         Ok(res)
      })
   }
}

fn paint(level: Level) -> colored::ColoredString {
   let label = level.as_str();
   match level {
      Level::Error => label.red().bold(),
      Level::Warn => label.yellow().bold(),
      Level::Info => label.green().bold(),
      Level::Debug => label.blue().bold(),
      Level::Trace => label.magenta().bold(),
   }
}

/// Installs the global logger; `RUST_LOG` picks the level, `info` when unset.
pub fn init_logger() {
   Builder::new()
   .filter_level(log::LevelFilter::Info)
   .parse_default_env()
   .format(|buf, record| {
      writeln!(buf, "{} {} - {}", paint(record.level()), record.target().dimmed(), record.args())
   })
   .init()
}
