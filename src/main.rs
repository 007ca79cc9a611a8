//! Amalgam CLI
//!
//! A demo host for the bridge: loads a script from a file, evaluates a
//! one-liner, or runs a REPL, against a host surface that mirrors the
//! classic demo catalog (a `sentinel` class plus injected `print`/`add`).

use amalgam::{
    Access, ClassBuilder, Error, Handle, HandleRegistry, Host, HostValue, NativeObject, Value,
    VERSION,
};
use anyhow::Context as _;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Parser)]
#[command(name = "amalgam")]
#[command(author, version, about = "A native/script object bridge", long_about = None)]
struct Cli {
    /// Script file to execute
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Evaluate a string of script code
    #[arg(short, long, value_name = "CODE")]
    eval: Option<String>,

    /// Print the binding descriptor for a registered class and exit
    #[arg(long, value_name = "CLASS")]
    describe: Option<String>,

    /// Verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let mut host = build_demo_host();

    if let Some(class) = cli.describe {
        let descriptor = host
            .describe(&class)
            .with_context(|| format!("no class named '{}'", class))?;
        println!("{}", serde_json::to_string_pretty(&descriptor)?);
        return Ok(());
    }

    if let Some(code) = cli.eval {
        report(host.run(&code));
        return Ok(());
    }

    if let Some(file) = cli.file {
        report(host.run_file(&file));
        return Ok(());
    }

    run_repl(&mut host)
}

fn setup_logging(verbosity: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbosity {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("amalgam=debug"),
        _ => EnvFilter::new("amalgam=trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn report(result: Result<Value, Error>) {
    match result {
        Ok(value) => println!("Script completed with result: {}", value),
        Err(err) => eprintln!("{}", err),
    }
}

fn run_repl(host: &mut Host) -> anyhow::Result<()> {
    use rustyline::error::ReadlineError;

    println!("Amalgam {} - native/script bridge", VERSION);
    println!("Type .help for help, .exit to quit\n");

    let mut editor = rustyline::DefaultEditor::new()?;
    loop {
        match editor.readline("> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                editor.add_history_entry(trimmed)?;

                match trimmed {
                    ".exit" | ".quit" => break,
                    ".help" => {
                        println!("REPL commands:");
                        println!("  .exit, .quit       - Exit the REPL");
                        println!("  .help              - Show this help");
                        println!("  .describe <class>  - Show a class binding");
                        println!("  .version           - Show version info");
                        continue;
                    }
                    ".version" => {
                        println!("Amalgam {}", VERSION);
                        continue;
                    }
                    _ if trimmed.starts_with(".describe ") => {
                        let class = trimmed[10..].trim();
                        match host.describe(class) {
                            Some(descriptor) => {
                                println!("{}", serde_json::to_string_pretty(&descriptor)?)
                            }
                            None => println!("No class named '{}'", class),
                        }
                        continue;
                    }
                    _ => {}
                }

                match host.run(&line) {
                    Ok(value) => {
                        if !value.is_undefined() {
                            println!("{}", value);
                        }
                    }
                    Err(err) => eprintln!("{}", err),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("REPL error: {}", err);
                break;
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Demo native catalog
// ---------------------------------------------------------------------------

static SENTINEL_COUNTER: AtomicU64 = AtomicU64::new(0);

/// The classic demo object: an accumulating string value, a read-only
/// instance number, and an owned child reachable through both mutable and
/// const accessors.
struct Sentinel {
    value: String,
    instance: u64,
    child: Option<Handle>,
}

impl Sentinel {
    fn new() -> Self {
        Self {
            value: String::new(),
            instance: SENTINEL_COUNTER.fetch_add(1, Ordering::Relaxed) + 1,
            child: None,
        }
    }
}

impl NativeObject for Sentinel {
    fn class_name(&self) -> &'static str {
        "sentinel"
    }
}

fn child_of(registry: &HandleRegistry, handle: &Handle) -> Result<Option<Handle>, Error> {
    Ok(registry.resolve_as::<Sentinel>(handle)?.borrow().child)
}

fn sentinel_binding() -> amalgam::ClassBinding {
    ClassBuilder::<Sentinel>::new("sentinel")
        .constructor(|_args| Ok(Sentinel::new()))
        .method_mut("foo", |s, args| {
            let text = args.first().map(|v| v.to_display()).unwrap_or_default();
            s.value.push_str(&text);
            Ok(Value::Undefined)
        })
        .method("bar", |s, _args| Ok(Value::String(s.value.clone())))
        .method("has_child", |s, _args| Ok(Value::Boolean(s.child.is_some())))
        .method_mut_raw("create_child", |registry, this, _args| {
            let cell = registry.resolve_as::<Sentinel>(this)?;
            let old = cell.borrow_mut().child.take();
            if let Some(old) = old {
                registry.destroy(&old)?;
            }
            let child = registry.register(Sentinel::new(), Access::Mutable);
            registry.adopt(this, &child)?;
            cell.borrow_mut().child = Some(child);
            Ok(Value::Native(child))
        })
        .method_mut_raw("get_child", |registry, this, _args| {
            match child_of(registry, this)? {
                Some(child) => Ok(Value::Native(child)),
                None => Err(Error::native_invocation("sentinel has no child")),
            }
        })
        .method_raw("get_child_const", |registry, this, _args| {
            match child_of(registry, this)? {
                Some(child) => Ok(Value::Native(child.as_const())),
                None => Err(Error::native_invocation("sentinel has no child")),
            }
        })
        .property(
            "value_",
            |s| Value::String(s.value.clone()),
            |s, v| {
                s.value = v.to_display();
                Ok(())
            },
        )
        .property_readonly("instance_", |s| Value::Number(s.instance as f64))
        .finish()
}

fn build_demo_host() -> Host {
    let mut host = Host::new();

    host.register_class(sentinel_binding())
        .expect("fresh host has no bindings yet");

    host.register_function("print", |args| {
        let text = args.first().map(|v| v.to_display()).unwrap_or_default();
        print!("{}", text);
        Ok(Value::Undefined)
    });

    host.register_function("add", |args| {
        let a = amalgam::marshal::to_native(
            args.first().unwrap_or(&Value::Undefined),
            amalgam::Expected::Number,
        )?;
        let b = amalgam::marshal::to_native(
            args.get(1).unwrap_or(&Value::Undefined),
            amalgam::Expected::Number,
        )?;
        match (a, b) {
            (HostValue::Number(a), HostValue::Number(b)) => Ok(Value::Number(a + b)),
            _ => Err(Error::native_invocation("add expects two numbers")),
        }
    });

    host.set_global("magic", HostValue::Number(13.37));
    host
}
