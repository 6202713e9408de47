use clap::{Parser, Subcommand};
use miette::Result;
use ocbind_clang::ClangBackend;
use ocbind_gen::{AstBackend, Generator, Policy};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ocbind")]
#[command(author, version, about = "Lua binding generator for OCCT-style C++ libraries")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate binding sources and annotation documents
    Generate {
        /// Library include directory (passed to clang as -I)
        inc_dir: PathBuf,

        /// Directory holding the module umbrella headers
        mod_dir: PathBuf,

        /// Output directory for generated files
        out_dir: PathBuf,

        /// Binding policy file
        #[arg(short, long, default_value = "ocbind.toml")]
        policy: PathBuf,

        /// Restrict the run to these modules (default: all from the policy)
        #[arg(short, long)]
        module: Vec<String>,
    },

    /// Validate a policy file without generating anything
    CheckPolicy {
        /// Binding policy file
        policy: PathBuf,
    },

    /// Parse one module header and print the lowered declarations
    Dump {
        /// Library include directory (passed to clang as -I)
        inc_dir: PathBuf,

        /// Module umbrella header to parse
        header: PathBuf,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            inc_dir,
            mod_dir,
            out_dir,
            policy,
            module,
        } => {
            let mut policy = Policy::from_file(&policy)?;
            if !module.is_empty() {
                policy.modules.retain(|m| module.contains(m));
            }

            let mut backend = ClangBackend::new(vec![inc_dir])?;
            let generator = Generator::new(policy, mod_dir, out_dir);
            let ctx = generator.run(&mut backend)?;

            if !ctx.diagnostics.is_empty() {
                eprintln!("{} anomalies during generation:", ctx.diagnostics.len());
                for diag in &ctx.diagnostics {
                    eprintln!("  {diag}");
                }
            }
        }

        Commands::CheckPolicy { policy } => {
            let parsed = Policy::from_file(&policy)?;
            println!(
                "{}: OK ({} modules, {} blacklisted classes)",
                policy.display(),
                parsed.modules.len(),
                parsed.black_list.class.len()
            );
        }

        Commands::Dump { inc_dir, header } => {
            let module = header
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("dump")
                .trim_start_matches('_')
                .to_string();
            let mut backend = ClangBackend::new(vec![inc_dir])?;
            let tu = backend.parse_module(&module, &header)?;

            println!("{} declarations", tu.len());
            for id in tu.roots() {
                let decl = tu.decl(id);
                println!(
                    "{:?} {} ({} children)",
                    decl.kind,
                    decl.name,
                    tu.children(id).len()
                );
            }
        }
    }

    Ok(())
}
