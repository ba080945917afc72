//! envtmpl - render templates using environment variables as context

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod exit_codes;

use commands::render::RenderOptions;
use error::CliError;

/// Environment variable holding a tracing filter directive
const LOG_ENV: &str = "ENVTMPL_LOG";

#[derive(Parser, Debug)]
#[command(name = "envtmpl")]
#[command(version)]
#[command(about = "Render templates using environment variables as context", long_about = None)]
#[command(disable_help_flag = true)]
struct Cli {
    /// `<tmplDir> <tmplName>`, `<tmplDir>/<tmplName>` or `-` for standard input
    #[arg(value_name = "ARGS")]
    args: Vec<String>,

    /// Print the function reference
    #[arg(short, long)]
    help: bool,

    /// Fail when a template reads a variable that is not set
    #[arg(long)]
    strict: bool,

    /// Left delimiter of template expressions
    #[arg(long, value_name = "DELIM", default_value = "")]
    left_delim: String,

    /// Right delimiter of template expressions
    #[arg(long, value_name = "DELIM", default_value = "")]
    right_delim: String,

    /// Enable debug output
    #[arg(long, env = "ENVTMPL_DEBUG")]
    debug: bool,
}

impl Cli {
    fn render_options(&self) -> RenderOptions {
        RenderOptions {
            args: self.args.clone(),
            strict: self.strict,
            left_delim: self.left_delim.clone(),
            right_delim: self.right_delim.clone(),
        }
    }
}

/// Log to stderr, but only when asked to
fn init_tracing(debug: bool) {
    let filter = match std::env::var(LOG_ENV) {
        Ok(directives) => EnvFilter::new(directives),
        Err(_) if debug => EnvFilter::new("envtmpl=debug,envtmpl_engine=debug"),
        Err(_) => return,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Print the error; with `--debug` the full diagnostic (source snippet, help)
fn report(err: CliError, debug: bool) -> i32 {
    let code = err.exit_code();
    if debug {
        eprintln!("{:?}", miette::Report::new(err));
    } else {
        eprintln!("{err}");
    }
    code
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.use_stderr() => {
            eprintln!("{err}");
            std::process::exit(exit_codes::USAGE_ERROR);
        }
        // --version
        Err(err) => err.exit(),
    };

    init_tracing(cli.debug);
    tracing::debug!(?cli, "parsed arguments");

    let result = if cli.help {
        let options = Cli::command().render_help().to_string();
        commands::help::run(&options).map(|()| exit_codes::USAGE_ERROR)
    } else {
        commands::render::run(&cli.render_options()).map(|()| exit_codes::SUCCESS)
    };

    let code = result.unwrap_or_else(|err| report(err, cli.debug));
    std::process::exit(code);
}
