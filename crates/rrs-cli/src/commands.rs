use std::io::{self, BufRead};
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use rrs_server::{htpasswd_line, load_credentials, parse_listen_addr, RrsServer, ServerConfig};
use rrs_store::{InMemoryObjectStore, LocalObjectStore, ObjectStore};
use tracing::{info, warn};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Htpasswd(args) => cmd_htpasswd(args),
    }
}

/// Translate serve flags into a server configuration.
pub fn server_config(args: &ServeArgs) -> anyhow::Result<ServerConfig> {
    let config = ServerConfig {
        bind_addr: parse_listen_addr(&args.listen)?,
        root: args.path.clone(),
        log_path: args.log.clone(),
        tls: args.tls,
        tls_cert: args.tls_cert.clone(),
        tls_key: args.tls_key.clone(),
        append_only: args.append_only,
        metrics: args.prometheus,
        debug: args.debug,
        idle_timeout_secs: args.timeout,
    };
    // Reject inconsistent TLS flags before touching storage.
    config.tls_settings()?;
    Ok(config)
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = server_config(&args)?;
    let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
    runtime.block_on(serve(config, args.memory))
}

async fn serve(config: ServerConfig, memory: bool) -> anyhow::Result<()> {
    let store: Arc<dyn ObjectStore> = if memory {
        warn!("serving from memory; repositories are lost on exit");
        Arc::new(InMemoryObjectStore::new())
    } else {
        let store = LocalObjectStore::new(&config.root)
            .await
            .with_context(|| format!("cannot use storage root {}", config.root.display()))?;
        Arc::new(store)
    };
    info!(root = %config.root.display(), "data directory");
    if config.append_only {
        info!("append-only mode enabled");
    }
    if config.metrics {
        info!("Prometheus metrics enabled");
    }

    let credentials = load_credentials(&config)?;
    let mut server = RrsServer::new(config, store)?;
    if let Some(credentials) = credentials {
        server = server.with_credentials(credentials);
    }
    server.serve().await?;
    Ok(())
}

fn cmd_htpasswd(args: HtpasswdArgs) -> anyhow::Result<()> {
    let password = match args.password {
        Some(p) => p,
        None => read_password(io::stdin().lock())?,
    };
    let line = htpasswd_line(&args.user, &password)?;
    println!("{line}");
    eprintln!(
        "{} Add this line to {} under the storage root.",
        "✓".green().bold(),
        ".htpasswd".bold()
    );
    Ok(())
}

fn read_password(mut input: impl BufRead) -> anyhow::Result<String> {
    let mut line = String::new();
    input.read_line(&mut line).context("failed to read password")?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        bail!("empty password");
    }
    Ok(password.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    fn serve_args(argv: &[&str]) -> ServeArgs {
        let mut full = vec!["rrs", "serve"];
        full.extend_from_slice(argv);
        let Command::Serve(args) = Cli::try_parse_from(full).unwrap().command else {
            panic!("expected the serve command");
        };
        args
    }

    #[test]
    fn config_from_defaults() {
        let config = server_config(&serve_args(&[])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(config.root, PathBuf::from("/tmp/restic"));
        assert!(!config.metrics);
    }

    #[test]
    fn config_from_flags() {
        let config = server_config(&serve_args(&[
            "--listen", ":9000", "--append-only", "--prometheus", "--timeout", "0",
        ]))
        .unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:9000".parse().unwrap());
        assert!(config.append_only);
        assert!(config.metrics);
        assert!(config.idle_timeout().is_none());
    }

    #[test]
    fn tls_paths_without_tls_are_rejected() {
        assert!(server_config(&serve_args(&["--tls-cert", "/etc/cert.pem"])).is_err());
    }

    #[test]
    fn bad_listen_address() {
        assert!(server_config(&serve_args(&["--listen", "nowhere"])).is_err());
    }

    #[test]
    fn password_from_input() {
        assert_eq!(read_password(&b"secret\r\n"[..]).unwrap(), "secret");
        assert_eq!(read_password(&b"with space\n"[..]).unwrap(), "with space");
        assert!(read_password(&b"\n"[..]).is_err());
        assert!(read_password(&b""[..]).is_err());
    }
}
