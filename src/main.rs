//! Purpose: `bodyvars` CLI entry point and command dispatch.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `core::error::to_exit_code`.
//! Invariants: Documents are decoded through the library seam, never ad hoc.

use std::io::Read;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde_json::json;

mod serve;

use bodyvars::core::error::{Error, ErrorKind, to_exit_code};
use bodyvars::core::path::{self, Resolved};
use bodyvars::core::replacer::Replacer;
use bodyvars::core::vars::BodyVars;
use serve::ServeConfig;

#[derive(Parser)]
#[command(
    name = "bodyvars",
    version,
    about = "JSON body values as template placeholders",
    long_about = None,
    before_help = r#"Resolve dotted paths (ref.joe.2.sum) inside JSON documents and expose
them as {json.*} placeholders, standalone or per HTTP request."#,
    after_help = r#"EXAMPLES
  $ echo '{"user":{"name":"lee"}}' | bodyvars resolve user.name
  $ echo '{"user":{"name":"lee"}}' | bodyvars expand 'hello {json.user.name}'
  $ bodyvars serve --bind 127.0.0.1:7070 --strict
"#
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Run the placeholder HTTP server",
        after_help = r#"EXAMPLES
  $ bodyvars serve
  $ bodyvars serve --strict --template 'hi {json.user.name}'
  $ curl -d '{"user":{"name":"lee"}}' 'http://127.0.0.1:7070/v0/lookup?key=json.user.name'
"#
    )]
    Serve(ServeArgs),
    #[command(about = "Resolve a dotted path against a JSON document")]
    Resolve(ResolveArgs),
    #[command(about = "Expand {json.*} placeholders against a JSON document")]
    Expand(ExpandArgs),
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1:7070", help = "Listen address")]
    bind: SocketAddr,
    #[arg(long, help = "Reject requests whose body is not valid JSON (HTTP 400)")]
    strict: bool,
    #[arg(long, help = "Default template for /v0/expand")]
    template: Option<String>,
    #[arg(long, help = "Read the default template from a file")]
    template_file: Option<PathBuf>,
    #[arg(
        long,
        default_value_t = 1024 * 1024,
        help = "Maximum request body size in bytes"
    )]
    max_body_bytes: u64,
    #[arg(long, help = "Permit binding to non-loopback addresses")]
    allow_non_loopback: bool,
}

#[derive(Args)]
struct ResolveArgs {
    #[arg(help = "Dotted path, e.g. ref.joe.2.sum (empty addresses the root)")]
    path: String,
    #[arg(long, help = "Read the document from a file instead of stdin")]
    file: Option<PathBuf>,
}

#[derive(Args)]
struct ExpandArgs {
    #[arg(help = "Template with {json.*} placeholders")]
    template: String,
    #[arg(long, help = "Read the document from a file instead of stdin")]
    file: Option<PathBuf>,
}

fn main() {
    let exit_code = match run() {
        Ok(()) => 0,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<(), Error> {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => {
            let config = serve_config_from_args(args)?;
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to start runtime")
                        .with_source(err)
                })?;
            runtime.block_on(serve::serve(config))
        }
        Command::Resolve(args) => {
            let document = read_document(args.file.as_deref())?;
            let vars = BodyVars::from_slice(&document)?;
            match path::resolve(vars.root(), &args.path) {
                // The lookup surfaces collapse absent to null; the CLI is
                // where the distinction stays visible, via the exit code.
                Resolved::Value(value) => {
                    println!("{value}");
                    Ok(())
                }
                Resolved::Absent => Err(Error::new(ErrorKind::NotFound)
                    .with_message(format!("path `{}` not present in document", args.path))),
            }
        }
        Command::Expand(args) => {
            let document = read_document(args.file.as_deref())?;
            let vars = BodyVars::from_slice(&document)?;
            let mut replacer = Replacer::new();
            replacer.push(Arc::new(vars));
            println!("{}", replacer.expand(&args.template));
            Ok(())
        }
    }
}

fn serve_config_from_args(args: ServeArgs) -> Result<ServeConfig, Error> {
    let template = match (args.template, args.template_file) {
        (Some(_), Some(_)) => {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("--template and --template-file are mutually exclusive")
                .with_hint("Pass the template inline or as a file, not both."));
        }
        (Some(template), None) => Some(template),
        (None, Some(template_file)) => {
            let raw = std::fs::read_to_string(&template_file).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read template file")
                    .with_path(&template_file)
                    .with_source(err)
            })?;
            Some(raw.trim_end_matches('\n').to_string())
        }
        (None, None) => None,
    };

    Ok(ServeConfig {
        bind: args.bind,
        strict: args.strict,
        template,
        max_body_bytes: args.max_body_bytes,
        allow_non_loopback: args.allow_non_loopback,
    })
}

fn read_document(file: Option<&Path>) -> Result<Vec<u8>, Error> {
    match file {
        Some(file) => std::fs::read(file).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read document")
                .with_path(file)
                .with_source(err)
        }),
        None => {
            let mut buffer = Vec::new();
            std::io::stdin().read_to_end(&mut buffer).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read document from stdin")
                    .with_source(err)
            })?;
            Ok(buffer)
        }
    }
}

fn emit_error(err: &Error) {
    let mut body = serde_json::Map::new();
    body.insert("kind".into(), json!(format!("{:?}", err.kind())));
    body.insert("message".into(), json!(err.message().unwrap_or("error")));
    if let Some(hint) = err.hint() {
        body.insert("hint".into(), json!(hint));
    }
    if let Some(path) = err.path() {
        body.insert("path".into(), json!(path.display().to_string()));
    }
    eprintln!("{}", json!({ "error": body }));
}
