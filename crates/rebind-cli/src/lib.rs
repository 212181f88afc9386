#![forbid(unsafe_code)]
#![deny(unused_must_use)]
#![warn(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]

//! Loading, logging and report rendering behind the `rebind` binary.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use rebind_script::Composition;
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

/// Maximum source file size in bytes (1MB)
pub const MAX_SOURCE_SIZE: usize = 1_000_000;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Pretty,
    Json,
}

/// Install the stderr subscriber. `RUST_LOG` wins unless `verbose` asks
/// for debug output.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Read a script, refusing anything over [`MAX_SOURCE_SIZE`].
pub fn load_source(path: &Path) -> Result<String> {
    let src = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    if src.len() > MAX_SOURCE_SIZE {
        bail!(
            "source file exceeds {}MB limit ({} bytes)",
            MAX_SOURCE_SIZE / 1_000_000,
            src.len()
        );
    }
    Ok(src)
}

/// `Log` lines, then one line per call.
pub fn render_calls(compositions: &[Composition]) -> String {
    let mut out = String::new();
    for c in compositions {
        for call in &c.calls {
            for note in &call.notes {
                let _ = writeln!(out, "note: {note}");
            }
            let _ = writeln!(out, "{call}");
        }
    }
    out
}

#[derive(Serialize)]
struct ExplainReport<'a> {
    compositions: &'a [Composition],
}

/// Signature evolution and primitive trace of every composition.
pub fn render_explain(compositions: &[Composition], format: Format) -> Result<String> {
    if format == Format::Json {
        let mut json = serde_json::to_string_pretty(&ExplainReport { compositions })?;
        json.push('\n');
        return Ok(json);
    }
    let mut out = String::new();
    for (i, c) in compositions.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "composition {}: {}", i + 1, c.start);
        for step in &c.steps {
            let _ = writeln!(out, "  {:<40} {}", step.statement, step.signature);
        }
        match &c.endpoint {
            Some(endpoint) => {
                let _ = writeln!(out, "  endpoint: {endpoint}");
            }
            None => out.push_str("  (no endpoint)\n"),
        }
        out.push_str("  trace:\n");
        for line in &c.trace {
            let _ = writeln!(out, "    {line}");
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rebind_core::Capabilities;
    use rebind_script::{parse_str, Interpreter};

    fn compositions(src: &str, perform: bool) -> Vec<Composition> {
        let script = parse_str("<mem>", src).unwrap();
        let interp = Interpreter::new(Capabilities::default());
        if perform {
            interp.run(&script).unwrap()
        } else {
            interp.explain(&script).unwrap()
        }
    }

    #[test]
    fn notes_precede_their_call() {
        let out = compositions(
            r#"sig (s: String) -> String; fold_void Log::note; identity; call ("a");"#,
            true,
        );
        assert_eq!(render_calls(&out), "note: a\ncall(\"a\") = \"a\"\n");
    }

    #[test]
    fn pretty_explain_lists_steps_and_trace() {
        let out = compositions("sig (a: int, b: int) -> int; drop b; identity;", false);
        let text = render_explain(&out, Format::Pretty).unwrap();
        assert!(text.starts_with("composition 1: (a: int, b: int) -> int\n"), "{text}");
        assert!(text.contains("drop b;"), "{text}");
        assert!(text.contains("endpoint: identity"), "{text}");
        assert!(text.contains("    start (int, int)int"), "{text}");
    }

    #[test]
    fn json_explain_is_an_object() {
        let out = compositions("sig () -> void; nop;", false);
        let text = render_explain(&out, Format::Json).unwrap();
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["compositions"][0]["endpoint"], "nop");
    }

    #[test]
    fn oversized_sources_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.rebind");
        std::fs::write(&path, " ".repeat(MAX_SOURCE_SIZE + 1)).unwrap();
        let err = load_source(&path).unwrap_err().to_string();
        assert!(err.contains("exceeds 1MB limit"), "{err}");
    }
}
