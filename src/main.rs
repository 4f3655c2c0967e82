use std::{error::Error, fs, io::Read};

use cfgparse::{ConflictPolicy, Grammar, TableError, TokenStream};
use log::{error, info};

const OUTPUTS: [&str; 7] = ["prod", "nff", "predict", "ll1", "parse", "lr0fsm", "slrtable"];

fn print_help() {
    println!("Usage: cfgparse outputs [options] [grammar file] [token file]");
    println!("outputs:");
    println!("  prod: Productions");
    println!("  nff: Nullable first and follow");
    println!("  predict: Predict set of every production");
    println!("  ll1: LL(1) parsing table");
    println!("  parse: LL(1) parse tree of the token file");
    println!("  lr0fsm: LR(0) Automata");
    println!("  slrtable: SLR(1) parsing table");
    println!("options:");
    println!("  -h: Print this help");
    println!("  -l: Print in LaTeX format");
    println!("  -j: Print in JSON format");
    println!("  -c: Report every LL(1) conflict instead of the first");
    println!("The grammar is read from stdin when no grammar file is given.");
}

enum OutputFormat {
    Plain,
    LaTeX,
    JSON,
}

fn report_conflicts(g: &Grammar, policy: ConflictPolicy) {
    if let Err(TableError::Conflicts(conflicts)) = g.generate_ll1_parsing_table_with(policy) {
        for c in conflicts {
            error!("{}", c);
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut outputs: Vec<&str> = Vec::new();
    let args = std::env::args().skip(1).collect::<Vec<String>>();
    let mut i: usize = 0;
    while i < args.len() && OUTPUTS.contains(&args[i].as_str()) {
        outputs.push(args[i].as_str());
        i += 1;
    }

    let mut output_format = OutputFormat::Plain;
    let mut policy = ConflictPolicy::FailFast;

    while i < args.len() && ["-h", "--help", "-l", "-j", "-c"].contains(&args[i].as_str()) {
        match args[i].as_str() {
            "-l" => output_format = OutputFormat::LaTeX,
            "-j" => output_format = OutputFormat::JSON,
            "-c" => policy = ConflictPolicy::Collect,
            _ => {
                print_help();
                return Ok(());
            }
        }
        i += 1;
    }

    if i + 2 < args.len() || outputs.is_empty() {
        print_help();
        return Ok(());
    }

    let input: String = match args.get(i) {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            input
        }
    };
    let token_file = args.get(i + 1);

    let g = Grammar::parse(&input)?;
    info!(
        "grammar has {} symbols, start symbol {}",
        g.symbols().len(),
        g.get_symbol_name(g.start_symbol())
    );

    for output in outputs {
        let text = match output {
            "prod" => {
                let t = g.to_production_output_vec();
                match output_format {
                    OutputFormat::Plain => t.to_plaintext(),
                    OutputFormat::LaTeX => t.to_latex(),
                    OutputFormat::JSON => serde_json::to_string(&t)?,
                }
            }
            "nff" => {
                let t = g.to_non_terminal_output_vec()?;
                match output_format {
                    OutputFormat::Plain => t.to_plaintext(),
                    OutputFormat::LaTeX => t.to_latex(),
                    OutputFormat::JSON => t.to_json()?,
                }
            }
            "predict" => {
                let t = g.to_predict_output_vec()?;
                match output_format {
                    OutputFormat::Plain => t.to_plaintext(),
                    OutputFormat::LaTeX => t.to_latex(),
                    OutputFormat::JSON => serde_json::to_string(&t)?,
                }
            }
            "ll1" => {
                let t = g.to_ll1_parsing_table_output()?;
                report_conflicts(&g, policy);
                match output_format {
                    OutputFormat::Plain => t.to_plaintext(),
                    OutputFormat::LaTeX => t.to_latex(),
                    OutputFormat::JSON => serde_json::to_string(&t)?,
                }
            }
            "parse" => {
                let path = token_file.ok_or("parse needs a token file")?;
                let mut tokens = TokenStream::parse(&fs::read_to_string(path)?);
                let table = g.generate_ll1_parsing_table_with(policy)?;
                let tree = g.ll1_parse(&table, &mut tokens)?;
                match output_format {
                    OutputFormat::Plain => tree.to_plaintext(&g),
                    OutputFormat::LaTeX => tree.to_latex(&g),
                    OutputFormat::JSON => serde_json::to_string(&tree.to_output(&g))?,
                }
            }
            "lr0fsm" => {
                let t = g.to_lr0_fsm();
                match output_format {
                    OutputFormat::Plain | OutputFormat::LaTeX => t.to_plaintext(&g),
                    OutputFormat::JSON => serde_json::to_string(&t)?,
                }
            }
            "slrtable" => {
                let t = g.to_lr0_fsm().to_slr_table(&g)?;
                for c in t.conflicts(&g) {
                    error!("SLR(1) conflict in state {} on {}", c.state, c.terminal);
                }
                match output_format {
                    OutputFormat::Plain => t.to_plaintext(&g),
                    OutputFormat::LaTeX => t.to_latex(&g),
                    OutputFormat::JSON => serde_json::to_string(&t)?,
                }
            }
            _ => unreachable!(),
        };
        println!("{}", text);
    }

    Ok(())
}

fn main() {
    pretty_env_logger::init();

    if let Err(e) = run() {
        error!("{}", e);
        std::process::exit(1);
    }
}
