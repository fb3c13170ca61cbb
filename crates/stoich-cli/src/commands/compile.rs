use crate::cli::CompileArgs;
use crate::config::PartialBuildConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use std::path::Path;
use stoichkit::{
    core::{io::model_file, models::model::Model},
    engine::progress::ProgressReporter,
    workflows::{self, compile::CompileReport},
};
use tracing::{info, warn};

pub fn run(args: CompileArgs) -> Result<()> {
    let partial_config = PartialBuildConfig::from_file(&args.config)?;
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(&args)?;

    let mut model = load_model(&args.model)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    info!("Invoking the compile workflow...");
    let mut result = workflows::compile::run(&mut model, &config, &reporter)?;
    if args.matrix {
        result.report.attach_matrix(&result.stoich);
    }

    print_summary(&result.report);
    if args.matrix {
        println!("\nStoichiometry matrix (pools x rates):");
        print!("{}", result.stoich.matrix());
    }

    if let Some(output) = &args.output {
        write_report(&result.report, output)?;
        println!("✓ Report written to: {}", output.display());
    }
    Ok(())
}

pub(crate) fn load_model(path: &Path) -> Result<Model> {
    info!("Loading model from {:?}", path);
    model_file::load(path).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

fn print_summary(report: &CompileReport) {
    if report.status != 0 {
        warn!(status = report.status, "Compiled with a non-zero status.");
    }
    println!(
        "Compartment '{}' compiled with status {}.",
        report.compartment, report.status
    );
    println!(
        "  Pools: {} ({} variable, {} proxy, {} function, {} buffered)",
        report.num_all_pools,
        report.num_var_pools,
        report.num_proxy_pools,
        report.num_func_pools,
        report.num_buf_pools
    );
    println!(
        "  Rates: {} ({} core), {} matrix entries",
        report.num_rates, report.num_core_rates, report.num_entries
    );
    for proxy in &report.proxies {
        println!("  Proxies from '{}': {}", proxy.compartment, proxy.pools.join(", "));
    }
}

fn write_report(report: &CompileReport, path: &Path) -> Result<()> {
    let content = toml::to_string(report)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::{TempDir, tempdir};

    const MODEL: &str = r#"
[[compartment]]
name = "cyt"
voxel-volumes = [1e-18]

[[solver]]
name = "ks"
kind = "ksolve"

[[pool]]
name = "A"
compartment = "cyt"
conc-init = 1.0

[[pool]]
name = "B"
compartment = "cyt"

[[reac]]
name = "r"
compartment = "cyt"
kf = 2.0
substrates = ["A"]
products = ["B"]
"#;

    const BUILD: &str = r#"
compartment = "cyt"
path = "/cyt/##"
ksolve = "ks"
"#;

    struct TestFiles {
        _dir: TempDir,
        model: PathBuf,
        config: PathBuf,
        output: PathBuf,
    }

    fn write_files(build: &str) -> TestFiles {
        let dir = tempdir().unwrap();
        let model = dir.path().join("model.toml");
        let config = dir.path().join("build.toml");
        let output = dir.path().join("report.toml");
        fs::write(&model, MODEL).unwrap();
        fs::write(&config, build).unwrap();
        TestFiles {
            _dir: dir,
            model,
            config,
            output,
        }
    }

    fn compile_args(files: &TestFiles, extra: &[&str]) -> CompileArgs {
        let mut args = vec![
            "stoich".to_string(),
            "compile".to_string(),
            "-m".to_string(),
            files.model.display().to_string(),
            "-c".to_string(),
            files.config.display().to_string(),
            "-o".to_string(),
            files.output.display().to_string(),
        ];
        args.extend(extra.iter().map(|s| s.to_string()));
        match Cli::parse_from(args).command {
            Commands::Compile(args) => args,
            _ => panic!("Expected 'compile' subcommand"),
        }
    }

    #[test]
    fn compile_writes_report() {
        let files = write_files(BUILD);
        run(compile_args(&files, &[])).unwrap();

        let report = fs::read_to_string(&files.output).unwrap();
        assert!(report.contains("status = 0"));
        assert!(report.contains("num-var-pools = 2"));
        assert!(report.contains("num-rates = 1"));
        assert!(!report.contains("matrix-entry"));
    }

    #[test]
    fn compile_with_matrix_and_one_way() {
        let files = write_files(BUILD);
        run(compile_args(&files, &["--matrix", "--one-way"])).unwrap();

        let report = fs::read_to_string(&files.output).unwrap();
        assert!(report.contains("one-way = true"));
        assert!(report.contains("num-rates = 2"));
        assert!(report.contains("matrix-entry"));
    }

    #[test]
    fn unknown_solver_fails() {
        let files = write_files("compartment = \"cyt\"\npath = \"/cyt/##\"\nksolve = \"gs\"\n");
        let result = run(compile_args(&files, &[]));
        assert!(matches!(result, Err(CliError::Workflow(_))));
        assert!(!files.output.exists());
    }

    #[test]
    fn unreadable_model_is_a_parse_error() {
        let files = write_files(BUILD);
        fs::write(&files.model, "[[pool]]\nname = 3\n").unwrap();
        let result = run(compile_args(&files, &[]));
        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }
}
