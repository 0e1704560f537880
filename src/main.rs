use stencil5p::build_info;
use stencil5p::driver::*;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse_legacy(std::env::args()).unwrap_or_else(|e| e.exit());

    if args.build_info {
        build_info::print_report(env!("CARGO_PKG_NAME"));
        return ExitCode::SUCCESS;
    }

    #[cfg(feature = "profile-with-puffin")]
    let _puffin_server = {
        let server_addr = format!("127.0.0.1:{}", puffin_http::DEFAULT_PORT);
        match puffin_http::Server::new(&server_addr) {
            Ok(server) => {
                println!(
                    "Run this to view profiling data:  puffin_viewer {server_addr}"
                );
                profiling::puffin::set_scopes_on(true);
                Some(server)
            }
            Err(e) => {
                tracing::warn!("Profiling server unavailable: {}", e);
                None
            }
        }
    };

    let config = Config::from(args);
    match execute(&config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("*** ERROR: {}", e);
            ExitCode::FAILURE
        }
    }
}
