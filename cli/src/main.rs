mod manifest;
mod test_runner;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::Diagnostic;
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::EnvFilter;

use blockdoc::{BlockNode, Node, OutputMode, Payload, Schema};
use compiler::{AttachmentPolicy, CompileError, Compiled, Compiler};

use crate::manifest::Manifest;

const SUBCOMMANDS: &[&str] = &["compile", "validate", "test", "help"];

#[derive(Parser)]
#[command(name = "blockdoc", version, about = "Block tree report compiler")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log filter, e.g. `debug` or `compiler=trace`
    #[arg(long, global = true, default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a TOML report manifest into a document
    Compile(CompileArgs),

    /// Check an existing document against a schema
    Validate(ValidateArgs),

    /// Run .test.toml fixture files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct CompileArgs {
    /// Report manifest to compile
    file: String,

    /// Schema file (TOML); the builtin report schema by default
    #[arg(long)]
    schema: Option<String>,

    /// Attachment policy file (TOML)
    #[arg(long)]
    policy: Option<String>,

    /// Externalize any payload larger than this many bytes
    #[arg(long, value_name = "BYTES")]
    inline_threshold: Option<usize>,

    /// Inline every payload, overriding the manifest's mode
    #[arg(long)]
    embedded: bool,

    /// Compile and validate only (exit 0 if valid)
    #[arg(long)]
    check: bool,

    /// Print the compiled block tree instead of the document
    #[arg(long)]
    tree: bool,

    /// Directory to write attachments into
    #[arg(long, value_name = "DIR")]
    attachments: Option<PathBuf>,

    /// Write the document here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
struct ValidateArgs {
    /// Document to validate
    file: String,

    /// Schema file (TOML); the builtin report schema by default
    #[arg(long)]
    schema: Option<String>,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.toml file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    let cli = Cli::parse_from(with_default_subcommand(std::env::args().collect()));
    install_tracing(&cli.log);

    let color_choice = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    match cli.command {
        Command::Compile(args) => do_compile(args, color_choice),
        Command::Validate(args) => do_validate(args, color_choice),
        Command::Test(args) => {
            let path = Path::new(&args.path);
            if args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &args.category);
            process::exit(exit_code);
        }
    }
}

/// `blockdoc report.toml` is shorthand for `blockdoc compile report.toml`.
fn with_default_subcommand(mut args: Vec<String>) -> Vec<String> {
    let mut index = 1;
    while index < args.len() {
        let arg = args[index].as_str();
        if arg == "--log" {
            index += 2;
        } else if arg.starts_with('-') {
            index += 1;
        } else {
            if !SUBCOMMANDS.contains(&arg) {
                args.insert(index, "compile".to_string());
            }
            break;
        }
    }
    args
}

fn install_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {}", message);
    process::exit(1);
}

fn read_file(path: &str) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => fail(format_args!("cannot read '{}': {}", path, e)),
    }
}

fn load_schema(path: Option<&str>) -> Schema {
    let Some(path) = path else {
        return Schema::builtin();
    };
    Schema::from_toml(&read_file(path))
        .unwrap_or_else(|e| fail(format_args!("invalid schema '{}': {}", path, e)))
}

fn load_policy(args: &CompileArgs) -> AttachmentPolicy {
    let policy = match &args.policy {
        Some(path) => AttachmentPolicy::from_toml(&read_file(path))
            .unwrap_or_else(|e| fail(format_args!("invalid policy '{}': {}", path, e))),
        None => AttachmentPolicy::default(),
    };
    match args.inline_threshold {
        Some(bytes) => policy.with_inline_threshold(bytes),
        None => policy,
    }
}

fn do_compile(args: CompileArgs, color_choice: ColorChoice) {
    let manifest_path = Path::new(&args.file);
    let manifest = Manifest::load(manifest_path).unwrap_or_else(|e| fail(e));

    let mut meta = manifest.meta();
    if args.embedded {
        meta.mode = OutputMode::Embedded;
    }

    // Asset paths in the manifest are relative to the manifest itself
    let base_dir = manifest_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    let blocks = manifest.into_blocks(&base_dir).unwrap_or_else(|e| fail(e));

    let compiler = Compiler::new(load_schema(args.schema.as_deref()), load_policy(&args));
    let compiled = match compiler.compile(blocks, &meta) {
        Ok(compiled) => compiled,
        Err(CompileError::SchemaValidation {
            violation,
            document,
        }) => {
            let mut files = SimpleFiles::new();
            let file_id = files.add(format!("{} (compiled)", args.file), document);
            emit(color_choice, &files, &violation.to_diagnostic(file_id));
            process::exit(1);
        }
        Err(e) => fail(e),
    };

    if args.check {
        eprintln!(
            "ok: {} compiled ({} nodes, {} attachments)",
            args.file,
            compiled.tree.node_count(),
            compiled.attachments.len()
        );
        return;
    }

    match &args.attachments {
        Some(dir) => write_attachments(dir, &compiled),
        None if !compiled.attachments.is_empty() => tracing::warn!(
            count = compiled.attachments.len(),
            "attachments not written; pass --attachments <DIR> to keep them"
        ),
        None => {}
    }

    if args.tree {
        print_tree(&compiled.tree, 0);
        return;
    }

    match &args.output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, compiled.document.as_str()) {
                fail(format_args!("cannot write '{}': {}", path.display(), e));
            }
        }
        None => println!("{}", compiled.document),
    }
}

fn write_attachments(dir: &Path, compiled: &Compiled) {
    if let Err(e) = std::fs::create_dir_all(dir) {
        fail(format_args!("cannot create '{}': {}", dir.display(), e));
    }
    for attachment in &compiled.attachments {
        let path = dir.join(format!("attachment-{}", attachment.index));
        if let Err(e) = std::fs::write(&path, &attachment.data) {
            fail(format_args!("cannot write '{}': {}", path.display(), e));
        }
        eprintln!(
            "attachment://{}  {}  {}  {} bytes",
            attachment.index,
            attachment.block_id,
            attachment.mime,
            attachment.data.len()
        );
    }
}

fn print_tree(node: &BlockNode, indent: usize) {
    let pad = "  ".repeat(indent);
    match node {
        Node::Group { id, children } => {
            println!("{}Group {}", pad, id);
            for child in children {
                print_tree(child, indent + 1);
            }
        }
        Node::Leaf { id, content } => match content.payload() {
            Some(Payload::Attached(reference)) => {
                println!("{}{} {} -> {}", pad, content.element_name(), id, reference)
            }
            Some(payload) => println!(
                "{}{} {} ({} bytes)",
                pad,
                content.element_name(),
                id,
                payload.len()
            ),
            None => println!("{}{} {}", pad, content.element_name(), id),
        },
    }
}

fn do_validate(args: ValidateArgs, color_choice: ColorChoice) {
    let source = read_file(&args.file);
    let schema = load_schema(args.schema.as_deref());

    let mut files = SimpleFiles::new();
    let file_id = files.add(args.file.clone(), source.clone());

    match schema.validate(&source) {
        Ok(()) => eprintln!("ok: {} is valid", args.file),
        Err(violation) => {
            emit(color_choice, &files, &violation.to_diagnostic(file_id));
            process::exit(1);
        }
    }
}

fn emit(
    color_choice: ColorChoice,
    files: &SimpleFiles<String, String>,
    diagnostic: &Diagnostic<usize>,
) {
    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    let _ = term::emit_to_write_style(&mut writer.lock(), &config, files, diagnostic);
}
