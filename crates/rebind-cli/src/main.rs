use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use rebind_cli::{init_logging, load_source, render_calls, render_explain, Format};
use rebind_core::Capabilities;
use rebind_script::{parse_str, Interpreter};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "rebind")]
#[command(about = "Rebind: compose adapters around typed callables from binding scripts")]
struct Cli {
    /// Log engine activity at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build every composition and perform its calls
    Run {
        /// Path to the binding script
        file: PathBuf,

        /// Emulate try/finally with fold and catch instead of the native combinator
        #[arg(long)]
        emulate_try_finally: bool,
    },

    /// Show how each composition is built, without calling it
    Explain {
        /// Path to the binding script
        file: PathBuf,

        /// Emulate try/finally with fold and catch instead of the native combinator
        #[arg(long)]
        emulate_try_finally: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Pretty)]
        format: Format,
    },

    /// Parse a binding script and dump the syntax tree
    Parse {
        /// Path to the binding script
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Pretty)]
        format: Format,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            file,
            emulate_try_finally,
        } => cmd_run(&file, capabilities(emulate_try_finally)),
        Commands::Explain {
            file,
            emulate_try_finally,
            format,
        } => cmd_explain(&file, capabilities(emulate_try_finally), format),
        Commands::Parse { file, format } => cmd_parse(&file, format),
    }
}

fn capabilities(emulate_try_finally: bool) -> Capabilities {
    if emulate_try_finally {
        Capabilities::emulated()
    } else {
        Capabilities::native()
    }
}

fn cmd_run(file: &Path, caps: Capabilities) -> Result<()> {
    let src = load_source(file)?;
    let script = parse_str(&file.display().to_string(), &src)?;
    let compositions = Interpreter::new(caps).run(&script)?;
    info!(compositions = compositions.len(), "script finished");
    print!("{}", render_calls(&compositions));
    Ok(())
}

fn cmd_explain(file: &Path, caps: Capabilities, format: Format) -> Result<()> {
    let src = load_source(file)?;
    let script = parse_str(&file.display().to_string(), &src)?;
    let compositions = Interpreter::new(caps).explain(&script)?;
    print!("{}", render_explain(&compositions, format)?);
    Ok(())
}

fn cmd_parse(file: &Path, format: Format) -> Result<()> {
    let src = load_source(file)?;
    let script = parse_str(&file.display().to_string(), &src)?;
    match format {
        Format::Pretty => println!("{:#?}", script),
        Format::Json => println!("{}", serde_json::to_string_pretty(&script)?),
    }
    Ok(())
}
