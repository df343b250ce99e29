use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Args, CommandFactory, Parser as ClapParser, Subcommand};
use tracing_subscriber::EnvFilter;

use chunkwire::{
    ClientConfig, ClientError, HeaderWhitespace, HttpRequest, HttpResponse, ParseError,
    ParseStatus, ParserConfig, ResponseParser, format_debug, format_headers_only, format_json,
    send_with_config,
};

/// chunkwire CLI: incremental HTTP/1.1 chunked response parser.
///
/// `parse` reads a raw response from a file, --raw string, or stdin.
/// `fetch` sends a request to a server and parses what comes back.
/// Set RUST_LOG (e.g. `RUST_LOG=chunkwire=trace`) to see parser events.
#[derive(ClapParser)]
#[command(name = "chunkwire-cli", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a raw HTTP response.
    ///
    /// Escape sequences (\r, \n, \t, \\) in the --raw value are interpreted
    /// so you can pass a full response as a single shell argument.
    Parse(ParseArgs),
    /// Send a request and parse the response.
    Fetch(FetchArgs),
}

#[derive(Args)]
struct ParseArgs {
    /// Path to a file containing a raw HTTP response.
    /// Reads from stdin when neither FILE nor --raw is given.
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Raw HTTP response string (escape sequences \r \n \t \\ are expanded).
    #[arg(long)]
    raw: Option<String>,

    /// Feed the input to the parser in fragments of this many bytes.
    #[arg(long)]
    fragment_size: Option<usize>,

    #[command(flatten)]
    limits: LimitArgs,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct FetchArgs {
    /// Server host name or address.
    #[arg(long)]
    host: String,

    #[arg(long, default_value = "80")]
    port: u16,

    #[arg(long, default_value = "/")]
    path: String,

    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Extra header, as `Name: value` (repeatable).
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    headers: Vec<String>,

    /// Form field, as `key=value` (repeatable).
    #[arg(long, value_name = "KEY=VALUE", conflicts_with = "json")]
    form: Vec<String>,

    /// JSON request body.
    #[arg(long)]
    json: Option<String>,

    /// Socket read timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    #[command(flatten)]
    limits: LimitArgs,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct LimitArgs {
    /// Maximum allowed body size in bytes.
    #[arg(long, default_value = "10485760")]
    max_body_size: usize,

    /// Maximum number of headers allowed.
    #[arg(long, default_value = "128")]
    max_headers: usize,

    /// Skip any whitespace after a header colon instead of requiring one space.
    #[arg(long)]
    lenient_headers: bool,
}

impl LimitArgs {
    fn parser_config(&self) -> ParserConfig {
        ParserConfig {
            max_body_size: self.max_body_size,
            max_headers_count: self.max_headers,
            header_whitespace: if self.lenient_headers {
                HeaderWhitespace::Lenient
            } else {
                HeaderWhitespace::Strict
            },
            ..ParserConfig::default()
        }
    }
}

#[derive(Args)]
struct OutputArgs {
    /// Output format.
    #[arg(short, long, default_value = "json", value_enum)]
    format: OutputFormat,

    /// Pretty-print JSON output (ignored for other formats).
    #[arg(short, long)]
    pretty: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable debug output
    Debug,
    /// Status line + headers only
    Headers,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let (response, output) = match cli.command {
        Command::Parse(args) => (run_parse(&args), args.output),
        Command::Fetch(args) => (run_fetch(&args), args.output),
    };

    let response = response.unwrap_or_else(|failure| failure.exit());
    print!("{}", render(&response, &output));
}

/// A failure with the exit code it maps to.
enum Failure {
    Input(String),
    Parse(ParseError),
}

impl Failure {
    fn exit(self) -> ! {
        match self {
            Self::Input(msg) => {
                eprintln!("Error: {msg}");
                process::exit(1);
            }
            Self::Parse(e) => {
                eprintln!("Parse error: {e}");
                process::exit(2);
            }
        }
    }
}

impl From<ClientError> for Failure {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Parse(e) => Self::Parse(e),
            other => Self::Input(other.to_string()),
        }
    }
}

fn run_parse(args: &ParseArgs) -> Result<HttpResponse, Failure> {
    // When no input source is provided and stdin is a terminal (not piped),
    // show help instead of blocking.
    if args.file.is_none() && args.raw.is_none() && std::io::stdin().is_terminal() {
        Cli::command().print_help().ok();
        println!();
        process::exit(0);
    }

    let data = read_input(args).map_err(|e| Failure::Input(format!("reading input: {e}")))?;
    if data.is_empty() {
        return Err(Failure::Input("empty input".into()));
    }

    let mut parser = ResponseParser::with_config(args.limits.parser_config());
    let fragment = match args.fragment_size {
        Some(n) if n > 0 => n,
        _ => data.len(),
    };
    for piece in data.chunks(fragment) {
        if parser.feed(piece).map_err(Failure::Parse)? != ParseStatus::Incomplete {
            break;
        }
    }
    parser.finish().map_err(Failure::Parse)
}

fn run_fetch(args: &FetchArgs) -> Result<HttpResponse, Failure> {
    let mut request = HttpRequest::new(args.host.as_str())
        .port(args.port)
        .path(args.path.as_str())
        .method(args.method.as_str());

    for header in &args.headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| Failure::Input(format!("header '{header}' is not 'Name: value'")))?;
        request = request.header(name.trim(), value.trim_start());
    }
    for field in &args.form {
        let (key, value) = field
            .split_once('=')
            .ok_or_else(|| Failure::Input(format!("form field '{field}' is not 'key=value'")))?;
        request = request.form(key, value);
    }
    if let Some(json) = &args.json {
        let value = serde_json::from_str(json)
            .map_err(|e| Failure::Input(format!("--json is not valid JSON: {e}")))?;
        request = request.json(value);
    }

    let config = ClientConfig {
        read_timeout: args.timeout_ms.map(Duration::from_millis),
        parser: args.limits.parser_config(),
        ..ClientConfig::default()
    };
    Ok(send_with_config(&request, &config)?)
}

fn render(response: &HttpResponse, output: &OutputArgs) -> String {
    match output.format {
        OutputFormat::Json => format_json(response, output.pretty),
        OutputFormat::Debug => format_debug(response),
        OutputFormat::Headers => format_headers_only(response),
    }
}

/// Read raw HTTP bytes from --raw, a file, or stdin.
fn read_input(args: &ParseArgs) -> Result<Vec<u8>, std::io::Error> {
    if let Some(raw) = &args.raw {
        return Ok(unescape(raw).into_bytes());
    }
    match &args.file {
        Some(path) => std::fs::read(path),
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Expand C-style escape sequences (`\r`, `\n`, `\t`, `\\`) in a string.
///
/// Any other `\X` sequence is kept as-is (both the backslash and `X`).
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('r') => out.push('\r'),
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}
