//! Slotmark CLI
//!
//! Usage:
//!   slotmark [OPTIONS] [FILE]
//!
//! Options:
//!   -t, --template <NAME>  Template to render (default: last in dependency order)
//!   -d, --data <FILE>      JSON object bound to the template's points
//!   -p, --point <NAME>     Render only the node behind one point
//!   -c, --config <FILE>    Markup configuration (TOML format)
//!   --points               List compiled point paths instead of rendering
//!   --tree                 Print the materialized element tree
//!   -g, --grammar          Show template language reference
//!   -h, --help             Print help

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use slotmark::{Document, DomId, MarkupConfig, Record, TemplateError, TemplateRegistry};

#[derive(Parser)]
#[command(name = "slotmark")]
#[command(about = "Declarative markup templates with addressable points")]
struct Cli {
    /// Template source file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Template to render
    #[arg(short, long)]
    template: Option<String>,

    /// JSON data file bound to the template's points
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Render only the node behind this point
    #[arg(short, long)]
    point: Option<String>,

    /// Markup configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// List compiled point paths instead of rendering
    #[arg(long)]
    points: bool,

    /// Print the materialized element tree of the rendered markup
    #[arg(long)]
    tree: bool,

    /// Show template language reference
    #[arg(short, long)]
    grammar: bool,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.grammar {
        print_grammar();
        return;
    }

    // If no input file and stdin is a terminal (interactive), show intro help
    if cli.input.is_none() && io::stdin().is_terminal() {
        print_intro();
        return;
    }

    let config = match &cli.config {
        Some(path) => MarkupConfig::from_file(path)
            .unwrap_or_else(|e| fail(format!("Error loading config '{}': {}", path.display(), e))),
        None => MarkupConfig::default(),
    };

    let (source, filename) = read_source(cli.input.as_deref());

    let mut registry = TemplateRegistry::with_config(config);
    let order = match registry.register_source(&source) {
        Ok(order) => order,
        Err(TemplateError::Parse(errors)) => {
            for error in &errors {
                eprint!("{}", error.format(&source, &filename));
            }
            process::exit(1);
        }
        Err(e) => fail(format!("Error: {}", e)),
    };

    let Some(name) = cli.template.clone().or_else(|| order.last().cloned()) else {
        fail("Error: no templates declared".to_string());
    };

    if cli.points {
        print_points(&registry, &name);
        return;
    }

    let data = match &cli.data {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|json| Record::from_json_str(&json).map_err(|e| e.to_string()))
            .unwrap_or_else(|e| fail(format!("Error reading data '{}': {}", path.display(), e))),
        None => Record::new(),
    };

    let rendered = match &cli.point {
        Some(point) => registry.render_point(&name, point, &data),
        None => registry.render(&name, &data),
    };
    let html = rendered.unwrap_or_else(|e| fail(format!("Error: {}", e)));

    if cli.tree {
        let mut document = Document::new();
        match document.materialize(&html) {
            Ok(root) => print_tree(&document, root, 0),
            Err(e) => fail(format!("Error: {}", e)),
        }
    } else {
        println!("{}", html);
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

fn fail(message: String) -> ! {
    eprintln!("{}", message);
    process::exit(1);
}

fn read_source(input: Option<&Path>) -> (String, String) {
    match input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => (content, path.display().to_string()),
            Err(e) => fail(format!("Error reading file '{}': {}", path.display(), e)),
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => (buffer, "<stdin>".to_string()),
                Err(e) => fail(format!("Error reading from stdin: {}", e)),
            }
        }
    }
}

fn print_points(registry: &TemplateRegistry, name: &str) {
    let Some(descriptor) = registry.get(name) else {
        fail(format!("Error: template not found: {}", name));
    };
    for (point, entry) in descriptor.points() {
        // owner is always registered: it is this template or one of its dependencies
        let chain = registry
            .get(&entry.owner)
            .map(|owner| {
                let tree = owner.tree();
                tree.ancestry(entry.node)
                    .into_iter()
                    .map(|id| tree.get(id).label())
                    .collect::<Vec<_>>()
                    .join(" > ")
            })
            .unwrap_or_default();
        println!(
            "{:<20} {:<16} {:?} ({}: {})",
            point, entry.path.to_string(), entry.cardinality, entry.owner, chain
        );
    }
    for point in descriptor.ambiguous() {
        println!("{:<20} ambiguous", point);
    }
    for issue in descriptor.issues() {
        eprintln!("warning: {}", issue);
    }
}

fn print_tree(document: &Document, id: DomId, depth: usize) {
    let indent = "  ".repeat(depth);
    match document.tag(id) {
        Some(tag) => {
            let attributes = document
                .attributes(id)
                .map(|attrs| {
                    attrs
                        .iter()
                        .map(|(k, v)| format!(" {}=\"{}\"", k, v))
                        .collect::<String>()
                })
                .unwrap_or_default();
            println!("{}<{}{}>", indent, tag, attributes);
            for &child in document.child_nodes(id) {
                print_tree(document, child, depth + 1);
            }
        }
        None => {
            let text = document.text_content(id);
            if !text.trim().is_empty() {
                println!("{}{:?}", indent, text);
            }
        }
    }
}

fn print_intro() {
    println!(
        r#"Slotmark - declarative markup templates with addressable points

USAGE:
    slotmark [OPTIONS] [FILE]
    cat card.slot | slotmark -t Card

OPTIONS:
    -t, --template   Template to render (default: last in dependency order)
    -d, --data       JSON data file bound to the template's points
    -p, --point      Render only the node behind one point
    -c, --config     Markup configuration (TOML file)
    --points         List compiled point paths
    --tree           Print the materialized element tree
    -g, --grammar    Show template language reference
    -v, --verbose    Log debug output to stderr
    -h, --help       Print help

QUICK START:
    echo 'template Hello {{ p {{ "Hello " b #name }} }}' > hello.slot
    echo '{{"name": "Ada"}}' > data.json
    slotmark hello.slot -d data.json

Run --grammar for the template language reference."#
    );
}

fn print_grammar() {
    println!(
        r#"SLOTMARK TEMPLATE LANGUAGE
==========================

TEMPLATES
---------
template Name {{ node }}             One root node per template

NODES
-----
"text"                              Literal markup, emitted unchanged
tag #id [k: "v"] {{ node* }}          Element; every part after the tag is optional
use Name #id [k: "v"] {{ slot* }}     Reference to another template

POINTS
------
#id          Single point: data replaces the content or opens a scope
#id*         Multiple point: repeated once per item of a sequence
export       Marks the point as public (tooling only)

SLOTS
-----
point #id [k: "v"] {{ node* }}        Override a point of the referenced template

DATA (JSON)
-----------
"id": "markup"        Replace the point's content
"id": {{ ... }}         Render the point with a nested scope
"id": [ ... ]         Repeat a multiple point per item
"@id": {{ "k": "v" }}   Override the point's attributes
"_root", "@_root"     Bind the rendered root itself

COMMENTS
--------
// line comment
/* block comment */"#
    );
}
