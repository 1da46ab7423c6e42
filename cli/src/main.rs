mod test_runner;

use std::io::Write;
use std::path::Path;
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use serde::Deserialize;

use renderer::{Theme, ThemeRegistry};

const SUBCOMMANDS: &[&str] = &["render", "test", "themes", "help"];

#[derive(Parser)]
#[command(name = "pmdx", version, about = "PMDX document compiler")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a PMDX document to plain text
    Render(RenderArgs),

    /// Run .test.pmd golden test files
    Test(TestArgs),

    /// List built-in themes
    Themes,
}

#[derive(clap::Args)]
struct RenderArgs {
    /// PMDX source file to compile
    file: String,

    /// Theme to render with, overriding the document's config block
    #[arg(short, long)]
    theme: Option<String>,

    /// Parse only, don't render (exit 0 if valid)
    #[arg(long)]
    check: bool,

    /// Dump the parsed document tree
    #[arg(long)]
    ast: bool,

    /// Write rendered output to this file instead of stdout
    #[arg(short, long)]
    out: Option<String>,

    /// Config file path (defaults to ./pmdx.toml when present)
    #[arg(long)]
    config: Option<String>,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.pmd file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

/// Settings read from pmdx.toml. Lower precedence than both the command
/// line and the document's own config block.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    theme: Option<String>,
}

fn main() {
    // Backwards compatibility: if the first positional arg is not a known
    // subcommand, inject "render" so `pmdx cv.pmd` works like
    // `pmdx render cv.pmd`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(first_pos) = args.iter().skip(1).find(|a| !a.starts_with('-')) {
        let first_pos = first_pos.clone();
        if !SUBCOMMANDS.contains(&first_pos.as_str()) {
            let pos = args.iter().position(|a| *a == first_pos).unwrap();
            args.insert(pos, "render".to_string());
        }
    }

    let cli = Cli::parse_from(&args);

    match cli.command {
        Command::Render(render_args) => do_render(render_args, cli.no_color),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
        Command::Themes => {
            let themes = ThemeRegistry::builtin();
            let default = themes.default_theme().name;
            for name in themes.names() {
                if name == default {
                    println!("{} (default)", name);
                } else {
                    println!("{}", name);
                }
            }
        }
    }
}

fn do_render(args: RenderArgs, no_color: bool) {
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let source = match std::fs::read_to_string(&args.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", args.file, e);
            process::exit(1);
        }
    };

    let file_config = load_file_config(args.config.as_deref());

    // Set up codespan file database
    let mut files = SimpleFiles::new();
    let file_id = files.add(args.file.clone(), source.clone());

    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();

    let parser = pmdx::Parser::new(source, file_id);
    let doc = match parser.parse() {
        Ok(doc) => doc,
        Err(error) => {
            let diagnostic = error.to_diagnostic();
            let _ = term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic);
            process::exit(1);
        }
    };

    if args.check {
        eprintln!("ok: {} parsed successfully", args.file);
        return;
    }

    if args.ast {
        println!("{:#?}", doc);
        return;
    }

    // Theme precedence: --theme flag, then the document's config block,
    // then pmdx.toml, then the registry default.
    let themes = ThemeRegistry::builtin();
    let theme = match resolve_theme(&args, &doc, &file_config, &themes) {
        Ok(theme) => theme.clone(),
        Err(ThemeLookupError::Config(error)) => {
            let diagnostic = error.to_diagnostic();
            let _ = term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic);
            process::exit(1);
        }
        Err(ThemeLookupError::Named(name)) => {
            let available: Vec<&str> = themes.names().collect();
            eprintln!(
                "error: unknown theme '{}' (available: {})",
                name,
                available.join(", ")
            );
            process::exit(1);
        }
    };

    let tree = match renderer::render_document(&doc, &theme) {
        Ok(tree) => tree,
        Err(error) => {
            let diagnostic = error.to_diagnostic();
            let _ = term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic);
            process::exit(1);
        }
    };

    match &args.out {
        Some(path) => {
            let rendered = renderer::to_text(&tree);
            if let Err(e) = std::fs::write(path, rendered) {
                eprintln!("error: cannot write '{}': {}", path, e);
                process::exit(1);
            }
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            if renderer::write_text(&tree, &mut lock).and_then(|_| lock.flush()).is_err() {
                process::exit(1);
            }
        }
    }
}

enum ThemeLookupError {
    /// The document's config block names an unknown theme.
    Config(renderer::CompileError),
    /// A theme named on the command line or in pmdx.toml does not exist.
    Named(String),
}

fn resolve_theme<'a>(
    args: &RenderArgs,
    doc: &pmdx::Document,
    file_config: &FileConfig,
    themes: &'a ThemeRegistry,
) -> Result<&'a Theme, ThemeLookupError> {
    if let Some(name) = &args.theme {
        return themes
            .get(name)
            .ok_or_else(|| ThemeLookupError::Named(name.clone()));
    }
    if let Some(entry) = doc.config.theme() {
        return themes.get(&entry.value).ok_or_else(|| {
            ThemeLookupError::Config(renderer::CompileError::at(
                format!("unknown theme '{}'", entry.value),
                entry.line,
                doc.source_id,
            ))
        });
    }
    if let Some(name) = &file_config.theme {
        return themes
            .get(name)
            .ok_or_else(|| ThemeLookupError::Named(name.clone()));
    }
    Ok(themes.default_theme())
}

/// Load pmdx.toml. An explicit --config path must exist; the implicit
/// ./pmdx.toml is optional.
fn load_file_config(explicit: Option<&str>) -> FileConfig {
    let (path, required) = match explicit {
        Some(path) => (path, true),
        None => ("pmdx.toml", false),
    };
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            if required {
                eprintln!("error: cannot read '{}': {}", path, e);
                process::exit(1);
            }
            return FileConfig::default();
        }
    };
    match toml::from_str(&raw) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: invalid config '{}': {}", path, e);
            process::exit(1);
        }
    }
}
