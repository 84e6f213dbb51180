//! Server binary: HTTP shell around the queue engine

#![warn(missing_docs)]

mod catalog;
mod front;
mod http;

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use box_office_core::{Config, RequestHandler};
use box_office_queue::{QueueEngine, Store};
use tracing::info;

use front::Front;

/// Command line options
#[derive(Debug)]
struct Opts {
    /// Configuration of the queueing system
    config: Config,

    /// Port for the HTTP server to listen on
    port: u16,
    /// Host for the HTTP server to listen on
    host: String,
    /// Path to the event catalog JSON file
    catalog: PathBuf,
    /// Number of HTTP handler threads
    http_threads: u32,
}

impl Opts {
    fn from_args() -> Self {
        let mut opts = Opts {
            port: 8585,
            host: String::from("127.0.0.1"),
            catalog: PathBuf::from("./events.json"),
            config: Config::default(),
            http_threads: 16,
        };

        let mut option: Option<String> = None;
        for arg in std::env::args().skip(1) {
            if let Some(opt) = option {
                match opt.as_str() {
                    "-port" => opts.port = arg.parse().expect("-port takes a decimal u16"),
                    "-host" => opts.host = arg,
                    "-catalog" => opts.catalog = PathBuf::from(arg),
                    "-capacity" => {
                        opts.config.capacity = arg.parse().expect("-capacity takes a decimal usize")
                    }
                    "-tick-ms" => {
                        opts.config.tick = millis(&arg, "-tick-ms");
                    }
                    "-residency-ms" => {
                        opts.config.min_residency = millis(&arg, "-residency-ms");
                    }
                    "-delay-min-ms" => {
                        opts.config.admission_delay_min = millis(&arg, "-delay-min-ms");
                    }
                    "-delay-max-ms" => {
                        opts.config.admission_delay_max = millis(&arg, "-delay-max-ms");
                    }
                    "-http-threads" => {
                        opts.http_threads =
                            arg.parse().expect("-http-threads takes a decimal u32")
                    }
                    _ => {
                        eprintln!("Error: ignoring unknown option {opt}");
                        std::process::exit(1);
                    }
                }
                option = None;
            } else {
                option = Some(arg);
            }
        }
        if let Some(opt) = option {
            eprintln!("Error: ignoring leftover option {opt}");
            std::process::exit(1);
        }

        opts
    }
}

fn millis(arg: &str, opt: &str) -> Duration {
    Duration::from_millis(
        arg.parse()
            .unwrap_or_else(|_| panic!("{opt} takes a decimal number of milliseconds")),
    )
}

fn http_loop<H: RequestHandler>(server: &tiny_http::Server, handler: &H) {
    loop {
        let rq = server.recv().expect("HTTP receive failed");
        if let Some(rq) = http::parse(rq) {
            handler.handle(rq);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let opts = Opts::from_args();

    let events = match catalog::load(&opts.catalog) {
        Ok(events) => events,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };
    info!(events = events.len(), "catalog loaded");

    let store = Arc::new(Store::new(events));
    let engine = QueueEngine::new(store, opts.config);
    let front = Front::new(engine);

    let server = tiny_http::Server::http((opts.host.as_str(), opts.port))
        .expect("could not bind HTTP server");
    info!(host = %opts.host, port = opts.port, "listening");

    thread::scope(|s| {
        for i in 0..opts.http_threads {
            thread::Builder::new()
                .name(format!("http_{i}"))
                .spawn_scoped(s, || http_loop(&server, &front))
                .unwrap();
        }
    });
}
