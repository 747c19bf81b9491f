//! Binary entry point for the omcp-demo MCP servers.

use anyhow::Context;
use axum::Router;
use clap::{Args, Parser, Subcommand, ValueEnum};
use omcp_demo::{DEFAULT_BEARER_TOKEN, Demo, OAuthUrls, Posture, bearer_app, oauth_apps, open_app};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Example MCP servers with no auth, a static bearer token or OAuth 2.1.
#[derive(Parser)]
#[command(name = "omcp-demo", version, about, args_conflicts_with_subcommands = true)]
struct Cli {
    /// Transport used when no subcommand is given.
    #[arg(long, value_enum, env = "MCP_TRANSPORT", default_value_t = Transport::Stdio)]
    transport: Transport,

    /// HTTP settings used when no subcommand is given.
    #[command(flatten)]
    http: HttpArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    /// The explicit subcommand, or the one selected by `--transport`.
    fn into_command(self) -> Command {
        match (self.command, self.transport) {
            (Some(command), _) => command,
            (None, Transport::Stdio) => Command::Stdio {
                catalog: Posture::None,
            },
            (None, Transport::Http) => Command::Http(self.http),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Transport {
    Stdio,
    Http,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the catalog over stdin/stdout.
    Stdio {
        #[arg(long, value_enum, default_value_t = Posture::None)]
        catalog: Posture,
    },
    /// Serve over HTTP.
    Http(HttpArgs),
}

#[derive(Debug, Args)]
struct HttpArgs {
    /// Authentication posture.
    #[arg(long, value_enum, default_value_t = Posture::None)]
    auth: Posture,

    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Host name used in advertised URLs.
    #[arg(long, default_value = "localhost")]
    public_host: String,

    /// Port for the no-auth and bearer postures.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// MCP server port for the OAuth posture.
    #[arg(long, env = "MCP_PORT", default_value_t = 8004)]
    mcp_port: u16,

    /// Authorization server port for the OAuth posture.
    #[arg(long, env = "OAUTH_PORT", default_value_t = 8003)]
    oauth_port: u16,

    /// Token accepted by the bearer posture.
    #[arg(long, env = "MCP_AUTH_TOKEN", default_value = DEFAULT_BEARER_TOKEN)]
    token: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match Cli::parse().into_command() {
        Command::Stdio { catalog } => {
            if std::env::var_os("RUST_LOG").is_some() {
                tracing_subscriber::fmt()
                    .with_writer(std::io::stderr)
                    .with_env_filter(EnvFilter::from_default_env())
                    .init();
            }
            omcp::transport::serve_stdio(Demo::new(catalog).server()).await?;
        }
        Command::Http(args) => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
                )
                .init();
            serve_http(args).await?;
        }
    }
    Ok(())
}

async fn serve_http(args: HttpArgs) -> anyhow::Result<()> {
    let port = args.port.unwrap_or(args.auth.default_port());
    match args.auth {
        Posture::None => serve(&args.host, port, open_app()).await,
        Posture::Bearer => serve(&args.host, port, bearer_app(&args.token)).await,
        Posture::OAuth => {
            let urls = OAuthUrls {
                issuer: format!("http://{}:{}", args.public_host, args.oauth_port),
                resource: format!("http://{}:{}", args.public_host, args.mcp_port),
            };
            info!(issuer = %urls.issuer, resource = %urls.resource, "starting OAuth posture");
            let (auth_app, mcp_app) = oauth_apps(&urls);
            tokio::try_join!(
                serve(&args.host, args.oauth_port, auth_app),
                serve(&args.host, args.mcp_port, mcp_app),
            )?;
            Ok(())
        }
    }
}

async fn serve(host: &str, port: u16, app: Router) -> anyhow::Result<()> {
    let listener = TcpListener::bind((host, port))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use omcp_demo::Posture;

    use super::{Cli, Command};

    #[test]
    fn http_transport_without_subcommand_uses_top_level_args() {
        let cli = Cli::try_parse_from([
            "omcp-demo",
            "--transport",
            "http",
            "--auth",
            "bearer",
            "--port",
            "9100",
        ])
        .unwrap();
        match cli.into_command() {
            Command::Http(args) => {
                assert_eq!(args.auth, Posture::Bearer);
                assert_eq!(args.port, Some(9100));
                assert_eq!(args.host, "0.0.0.0");
            }
            other => panic!("expected http, got {other:?}"),
        }
    }

    #[test]
    fn subcommand_wins_over_transport() {
        let cli = Cli::try_parse_from(["omcp-demo", "stdio", "--catalog", "oauth"]).unwrap();
        assert!(matches!(
            cli.into_command(),
            Command::Stdio {
                catalog: Posture::OAuth
            }
        ));
    }

    #[test]
    fn top_level_args_conflict_with_subcommands() {
        assert!(Cli::try_parse_from(["omcp-demo", "--port", "1", "stdio"]).is_err());
    }
}
