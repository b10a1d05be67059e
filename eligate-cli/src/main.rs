// Copyright 2025 Eligate Contributors (https://github.com/eligate)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Command-line client for the Eligate gateway.
//!
//! Invokes one gateway tool over HTTP and pretty-prints the JSON response:
//!
//! ```text
//! eligate get-token
//! eligate mcid-search --body person.json
//! cat person.json | eligate submit-medical --url http://server:8080 --body -
//! ```

use std::io::Read;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, ValueEnum};
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(name = "eligate", author, version, about = "CLI client for the Eligate gateway tools", long_about = None)]
struct Args {
    /// Base URL of the gateway
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Tool to invoke
    #[arg(value_enum)]
    tool: Tool,

    /// Path to a JSON body file, or "-" to read from stdin
    #[arg(short, long)]
    body: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Tool {
    GetToken,
    McidSearch,
    SubmitMedical,
    All,
}

impl Tool {
    /// Name the gateway knows the tool by.
    fn wire_name(&self) -> &'static str {
        match self {
            Tool::GetToken => "get_token",
            Tool::McidSearch => "mcid_search",
            Tool::SubmitMedical => "submit_medical",
            Tool::All => "all",
        }
    }

    fn needs_body(&self) -> bool {
        matches!(self, Tool::McidSearch | Tool::SubmitMedical)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.tool.needs_body() && args.body.is_none() {
        Args::command()
            .error(
                clap::error::ErrorKind::MissingRequiredArgument,
                format!("--body is required for tool '{}'", args.tool.wire_name()),
            )
            .exit();
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let payload = match (&args.body, args.tool.needs_body()) {
        (Some(path), true) => load_body(path)?,
        (None, true) => anyhow::bail!("--body is required for tool '{}'", args.tool.wire_name()),
        _ => Value::Object(serde_json::Map::new()),
    };

    let endpoint = format!(
        "{}/tool/{}",
        args.url.trim_end_matches('/'),
        args.tool.wire_name()
    );
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("failed to build HTTP client")?;

    let response = client
        .post(&endpoint)
        .json(&payload)
        .send()
        .await
        .with_context(|| format!("request to {endpoint} failed"))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .context("failed to read response body")?;
    if !status.is_success() {
        anyhow::bail!("request failed: HTTP {status}: {text}");
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(_) => println!("{text}"),
    }
    Ok(())
}

/// Reads the request body from a file, or stdin when the path is `-`.
fn load_body(path: &str) -> Result<Value> {
    let content = if path == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read body from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read body file {path}"))?
    };
    serde_json::from_str(&content).with_context(|| format!("body {path} is not valid JSON"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn wire_names_match_the_gateway_tools() {
        assert_eq!(Tool::GetToken.wire_name(), "get_token");
        assert_eq!(Tool::McidSearch.wire_name(), "mcid_search");
        assert_eq!(Tool::SubmitMedical.wire_name(), "submit_medical");
        assert_eq!(Tool::All.wire_name(), "all");
    }

    #[test]
    fn only_the_search_and_submit_tools_need_a_body() {
        assert!(!Tool::GetToken.needs_body());
        assert!(!Tool::All.needs_body());
        assert!(Tool::McidSearch.needs_body());
        assert!(Tool::SubmitMedical.needs_body());
    }

    #[test]
    fn bodies_load_from_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"firstName": "JANE"}}"#).unwrap();
        let value = load_body(file.path().to_str().unwrap()).unwrap();
        assert_eq!(value["firstName"], "JANE");
    }

    #[test]
    fn invalid_bodies_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(load_body(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn cli_args_parse() {
        let args = Args::try_parse_from(["eligate", "get-token"]).unwrap();
        assert_eq!(args.tool, Tool::GetToken);
        assert_eq!(args.url, "http://localhost:8080");

        let args = Args::try_parse_from([
            "eligate",
            "mcid-search",
            "--body",
            "person.json",
            "--url",
            "http://server:8080",
        ])
        .unwrap();
        assert_eq!(args.tool, Tool::McidSearch);
        assert_eq!(args.body.as_deref(), Some("person.json"));
    }
}
