//! Command-line interface for exercising MCP servers.

use crate::{
    client::{Inspect, Target, connect},
    error::Error,
};
use clap::{Parser, Subcommand};
pub mod call;
pub mod oauth;

/// Drive MCP servers over HTTP or stdio, and run the OAuth flow.
#[derive(Parser, Debug)]
#[command(name = "omcp-inspect", version, about)]
pub struct App {
    /// Target MCP server: a URL (http/https) for remote servers,
    /// or a command for stdio servers.
    ///
    ///   omcp-inspect http://localhost:8002/mcp tool
    ///   omcp-inspect omcp-demo stdio call add a=5 b=3
    #[arg(num_args = 0..)]
    pub target: Vec<String>,

    /// Bearer token for authenticating with remote servers.
    #[arg(long = "auth", value_name = "TOKEN", env = "MCP_AUTH_TOKEN")]
    pub auth: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a session and print the server's initialize result.
    Init,
    /// List tools exposed by the server.
    Tool,
    /// Call a tool with arguments.
    Call {
        /// Name of the tool to call.
        name: String,

        /// Tool arguments as JSON key=value pairs (e.g. key1=value1 key2=value2).
        /// Values are parsed as JSON; plain strings are treated as JSON strings.
        #[arg(value_name = "KEY=VALUE")]
        args: Vec<String>,
    },
    /// Obtain an access token with the authorization-code flow.
    Oauth(oauth::OAuthArgs),
}

impl App {
    /// Parse CLI arguments and execute the corresponding command.
    pub async fn run() -> Result<(), Error> {
        App::parse().execute().await
    }

    pub async fn execute(self) -> Result<(), Error> {
        if let Command::Oauth(args) = &self.command {
            let token = oauth::run(args).await?;
            println!("{}", serde_json::to_string_pretty(&token)?);
            return Ok(());
        }

        let target = Target::parse(self.target, self.auth)?;
        let (mut service, info) = connect(target).await?;

        let outcome = match self.command {
            Command::Init => Ok(serde_json::to_string_pretty(&info)?),
            Command::Tool => match service.list_tools().await {
                Ok(tools) => Ok(serde_json::to_string_pretty(&tools)?),
                Err(e) => Err(e),
            },
            Command::Call { name, args } => match call::call(&mut service, &name, &args).await {
                Ok(result) => Ok(serde_json::to_string_pretty(&result)?),
                Err(e) => Err(e),
            },
            Command::Oauth(_) => Ok(String::new()),
        };

        service.close().await.ok();
        println!("{}", outcome?);
        Ok(())
    }
}
