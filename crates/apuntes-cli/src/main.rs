use anyhow::{Context, Result};
use std::env;
use std::io::Read;
use std::path::PathBuf;
use std::process;

use apuntes_config::ExportConfig;
use apuntes_engine::{Normalized, RenderOptions};
use serde_json::{Value, json};

enum OutputMode {
    Json,
    Text,
    Html,
}

struct Args {
    input: String,
    mode: OutputMode,
    output: Option<PathBuf>,
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {program} <input.json | -> [--json | --text | --html] [-o <file>]");
    eprintln!("Reads an AI enhancement response and prints the normalized document.");
    process::exit(1);
}

fn parse_args() -> Args {
    let args: Vec<String> = env::args().collect();
    let mut input = None;
    let mut mode = OutputMode::Json;
    let mut output = None;

    let mut iter = args[1..].iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--json" => mode = OutputMode::Json,
            "--text" => mode = OutputMode::Text,
            "--html" => mode = OutputMode::Html,
            "-o" => match iter.next() {
                Some(path) => output = Some(PathBuf::from(path)),
                None => {
                    eprintln!("Error: -o requires a file argument");
                    usage(&args[0]);
                }
            },
            other if input.is_none() => input = Some(other.to_string()),
            other => {
                eprintln!("Error: unexpected argument '{other}'");
                usage(&args[0]);
            }
        }
    }

    match input {
        Some(input) => Args {
            input,
            mode,
            output,
        },
        None => usage(&args[0]),
    }
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("Failed to read from stdin")?;
        Ok(raw)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read '{input}'"))
    }
}

fn render_options(config: &ExportConfig) -> RenderOptions {
    let stylesheet = config.stylesheet_path.as_ref().and_then(|path| {
        match std::fs::read_to_string(path) {
            Ok(css) => Some(css),
            Err(e) => {
                eprintln!("Warning: ignoring stylesheet '{}': {e}", path.display());
                None
            }
        }
    });
    RenderOptions {
        page_title: config.page_title.clone(),
        stylesheet,
        full_styles: !config.minimal_fallback,
    }
}

fn raw_display_page(raw: &Value) -> String {
    let text = raw["raw_content"].as_str().map(str::to_string);
    let text = text.unwrap_or_else(|| raw.to_string());
    format!(
        "<!DOCTYPE html>\n<html lang=\"es\">\n<head><meta charset=\"utf-8\"><title>Apuntes</title></head>\n\
         <body>\n<pre class=\"raw-block\">{}</pre>\n</body>\n</html>\n",
        html_escape::encode_text(&text)
    )
}

fn run(args: Args) -> Result<String> {
    let raw = read_input(&args.input)?;

    // A response that is not JSON at all is still displayable; wrap it the
    // way the enhancement boundary does.
    let value: Value =
        serde_json::from_str(&raw).unwrap_or_else(|_| json!({ "raw_content": raw }));

    let config = match ExportConfig::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("Warning: ignoring config file: {e}");
            ExportConfig::default()
        }
    };

    let normalized = apuntes_engine::normalize_document(value);
    let out = match (args.mode, normalized) {
        (OutputMode::Json, Normalized::Document(doc)) => {
            let value = serde_json::to_value(&doc)?;
            format!("{}\n", serde_json::to_string_pretty(&value)?)
        }
        (OutputMode::Json, Normalized::Raw(raw)) => {
            format!("{}\n", serde_json::to_string_pretty(&raw)?)
        }
        (OutputMode::Text, Normalized::Document(doc)) => apuntes_engine::document_to_text(&doc),
        (OutputMode::Text, Normalized::Raw(raw)) => {
            let text = raw["raw_content"].as_str().map(str::to_string);
            format!("{}\n", text.unwrap_or_else(|| raw.to_string()))
        }
        (OutputMode::Html, Normalized::Document(doc)) => {
            apuntes_engine::render_export_html(&doc, &render_options(&config))
        }
        (OutputMode::Html, Normalized::Raw(raw)) => raw_display_page(&raw),
    };
    Ok(out)
}

fn main() -> Result<()> {
    let args = parse_args();
    let output = args.output.clone();

    let rendered = match run(args) {
        Ok(rendered) => rendered,
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    };

    match output {
        Some(path) => std::fs::write(&path, rendered)
            .with_context(|| format!("Failed to write '{}'", path.display()))?,
        None => print!("{rendered}"),
    }
    Ok(())
}
