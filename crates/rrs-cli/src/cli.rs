use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "rrs",
    about = "REST server for restic repositories",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Whether diagnostic logging was requested.
    pub fn debug(&self) -> bool {
        match &self.command {
            Command::Serve(args) => args.debug,
            Command::Htpasswd(_) => false,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve repositories over the restic REST protocol
    Serve(ServeArgs),
    /// Print a credential file line for a user
    Htpasswd(HtpasswdArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Listen address; a bare `:port` binds all interfaces
    #[arg(long, default_value = ":8000")]
    pub listen: String,
    /// Append requests in combined log format to this file
    #[arg(long)]
    pub log: Option<PathBuf>,
    /// Storage root
    #[arg(long, default_value = "/tmp/restic")]
    pub path: PathBuf,
    /// Serve over TLS
    #[arg(long)]
    pub tls: bool,
    /// TLS certificate (default: <path>/public_key)
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,
    /// TLS key (default: <path>/private_key)
    #[arg(long)]
    pub tls_key: Option<PathBuf>,
    /// Refuse deletes of anything but locks
    #[arg(long)]
    pub append_only: bool,
    /// Count blob traffic and serve it at /metrics
    #[arg(long)]
    pub prometheus: bool,
    /// Log every operation and the cause of failures
    #[arg(long)]
    pub debug: bool,
    /// Seconds to wait for the next chunk of a request or response body; 0 disables it
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
    /// Keep repositories in memory instead of under --path
    #[arg(long)]
    pub memory: bool,
}

#[derive(Args)]
pub struct HtpasswdArgs {
    pub user: String,
    /// Password; read from stdin when omitted
    #[arg(long)]
    pub password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serve_defaults() {
        let cli = Cli::try_parse_from(["rrs", "serve"]).unwrap();
        assert!(!cli.debug());
        let Command::Serve(args) = cli.command else {
            panic!("expected the serve command");
        };
        assert_eq!(args.listen, ":8000");
        assert_eq!(args.path, PathBuf::from("/tmp/restic"));
        assert!(!args.tls);
        assert!(!args.append_only);
        assert!(!args.prometheus);
        assert!(!args.memory);
        assert_eq!(args.timeout, None);
    }

    #[test]
    fn parse_serve_flags() {
        let cli = Cli::try_parse_from([
            "rrs", "serve", "--listen", "127.0.0.1:9000", "--path", "/srv/restic",
            "--append-only", "--prometheus", "--debug", "--timeout", "30",
            "--tls", "--tls-key", "/etc/key.pem", "--log", "/var/log/rrs.log",
        ])
        .unwrap();
        assert!(cli.debug());
        let Command::Serve(args) = cli.command else {
            panic!("expected the serve command");
        };
        assert_eq!(args.listen, "127.0.0.1:9000");
        assert!(args.append_only && args.prometheus && args.tls);
        assert_eq!(args.timeout, Some(30));
        assert_eq!(args.tls_key, Some(PathBuf::from("/etc/key.pem")));
        assert_eq!(args.tls_cert, None);
        assert_eq!(args.log, Some(PathBuf::from("/var/log/rrs.log")));
    }

    #[test]
    fn parse_htpasswd() {
        let cli = Cli::try_parse_from(["rrs", "htpasswd", "alice", "--password", "pw"]).unwrap();
        let Command::Htpasswd(args) = cli.command else {
            panic!("expected the htpasswd command");
        };
        assert_eq!(args.user, "alice");
        assert_eq!(args.password, Some("pw".into()));
    }

    #[test]
    fn htpasswd_requires_user() {
        assert!(Cli::try_parse_from(["rrs", "htpasswd"]).is_err());
    }
}
