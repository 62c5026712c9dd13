use clap::{Parser, ValueEnum};
use dotpipe_ast::ast::{Expr, ExprKind};
use dotpipe_ast::pretty::print_expr;
use dotpipe_parser::parse_program;
use dotpipe_runtime::pipe::{classify, unroll, PipeKind};
use dotpipe_runtime::{eval, eval_program, Env, Options, PipeMode, Value};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "dotpipe", version, about = "Evaluate programs built from pipe chains")]
struct Opt {
    /// Program file to run
    file: Option<std::path::PathBuf>,

    /// Program text given inline
    #[arg(short = 'e', long = "eval", conflicts_with = "file")]
    eval: Option<String>,

    /// How pipe chains are evaluated
    #[arg(long = "pipe-mode", value_enum, default_value_t = PipeModeArg::Auto)]
    pipe_mode: PipeModeArg,

    /// Print the parsed program as JSON instead of running it
    #[arg(long = "dump-ast", default_value_t = false)]
    dump_ast: bool,

    /// Print each top-level pipe chain unrolled, one step per line
    #[arg(long = "unroll", default_value_t = false)]
    unroll: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PipeModeArg {
    Auto,
    Eager,
    Lazy,
}

impl From<PipeModeArg> for PipeMode {
    fn from(m: PipeModeArg) -> Self {
        match m {
            PipeModeArg::Auto => PipeMode::Auto,
            PipeModeArg::Eager => PipeMode::Eager,
            PipeModeArg::Lazy => PipeMode::Lazy,
        }
    }
}

fn setup_logging(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    let formatter = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_level(true);

    tracing_subscriber::registry().with(formatter).with(filter).init();
}

fn print_unrolled(env: &Env, stmt: &Expr) -> Result<(), Box<dyn std::error::Error>> {
    let kind = classify(stmt);
    match (&stmt.kind, kind) {
        (ExprKind::Call { args, .. }, k) if k != PipeKind::None && args.len() == 2 => {
            let unrolled = unroll(&args[0], &args[1], env, kind).map_err(|e| format!("{}", e))?;
            for step in &unrolled.exprs {
                println!("{}", print_expr(step));
            }
            if let Some(target) = &unrolled.assign {
                println!("-> {}", print_expr(target));
            }
        }
        // definitions still run, so escaped operands can refer to them
        _ => {
            eval(env, stmt).map_err(|e| format!("{}", e))?;
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::parse();
    setup_logging(opt.verbose);

    let code = match (&opt.eval, &opt.file) {
        (Some(code), _) => code.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?,
        (None, None) => return Err("no program given: pass FILE or -e CODE".into()),
    };
    let prog = parse_program(&code).map_err(|e| format!("{}", e))?;
    debug!(statements = prog.len(), "parsed program");

    if opt.dump_ast {
        println!("{}", serde_json::to_string_pretty(&prog)?);
        return Ok(());
    }

    let env = Env::with_options(Options { pipe_mode: opt.pipe_mode.into() });
    info!(pipe_mode = ?env.options().pipe_mode, "starting evaluation");

    if opt.unroll {
        for stmt in &prog {
            print_unrolled(&env, stmt)?;
        }
        return Ok(());
    }

    let v = eval_program(&env, &prog).map_err(|e| format!("{}", e))?;
    if !matches!(v, Value::Null) {
        println!("{}", v);
    }
    Ok(())
}
