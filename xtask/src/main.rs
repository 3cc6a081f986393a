use anyhow::{Context, Result};
use cashback_extension::ExtensionConfig;
use clap::{Parser, Subcommand};
use std::process::{Command, Stdio};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Cashback extension task runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the extension wasm bundle with wasm-pack
    Build {
        /// Debug build (faster, larger)
        #[arg(long)]
        dev: bool,

        /// wasm-pack target
        #[arg(long, default_value = "no-modules")]
        target: String,
    },

    /// Run all Rust tests
    Test,

    /// Run clippy linter
    Clippy,

    /// Remove build output (target/ and extension/pkg/)
    Clean,

    /// Write the default extension config
    GenConfig {
        /// Output path
        #[arg(short, long, default_value = "extension/cashback.toml")]
        output: String,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a config file
    CheckConfig {
        #[arg(default_value = "extension/cashback.toml")]
        path: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { dev, target } => build(dev, &target),
        Commands::Test => test(),
        Commands::Clippy => clippy(),
        Commands::Clean => clean(),
        Commands::GenConfig { output, force } => gen_config(&output, force),
        Commands::CheckConfig { path } => check_config(&path),
    }
}

fn build(dev: bool, target: &str) -> Result<()> {
    println!("🔨 Building extension ({})...", if dev { "dev" } else { "release" });
    let profile = if dev { "--dev" } else { "--release" };
    run_cmd(
        "wasm-pack",
        &["build", "extension", profile, "--target", target, "--out-dir", "pkg"],
    )?;
    println!("✅ Bundle written to extension/pkg/");
    Ok(())
}

fn test() -> Result<()> {
    println!("🧪 Running all tests...");
    run_cmd("cargo", &["test", "--workspace"])
}

fn clippy() -> Result<()> {
    println!("🔍 Running clippy on workspace (warnings as errors)...");
    run_cmd(
        "cargo",
        &[
            "clippy",
            "--workspace",
            "--all-targets",
            "--",
            "-D",
            "warnings",
        ],
    )?;
    println!("🔍 Checking wasm32 build...");
    run_cmd(
        "cargo",
        &[
            "clippy",
            "-p",
            "cashback-extension",
            "--target",
            "wasm32-unknown-unknown",
            "--",
            "-D",
            "warnings",
        ],
    )
}

fn clean() -> Result<()> {
    println!("🧹 Removing build output...");
    run_cmd("cargo", &["clean"])?;

    // Ignore error if the bundle was never built
    let _ = std::fs::remove_dir_all("extension/pkg");
    Ok(())
}

fn gen_config(output: &str, force: bool) -> Result<()> {
    if !force && std::path::Path::new(output).exists() {
        anyhow::bail!("{} already exists (use --force to overwrite)", output);
    }

    let content = ExtensionConfig::default().to_toml_string()?;
    std::fs::write(output, content).with_context(|| format!("Failed to write {}", output))?;
    println!("📝 Wrote default config to {}", output);
    Ok(())
}

fn check_config(path: &str) -> Result<()> {
    let config = ExtensionConfig::load(path)?;
    println!("✅ {} is valid", path);
    println!("   address key: {}", config.storage.address_key);
    println!("   pending key: {}", config.storage.pending_key);
    println!("   sdk endpoint: {}", config.sdk.environment.as_str());
    Ok(())
}

// Helper functions
fn run_cmd(program: &str, args: &[&str]) -> Result<()> {
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .with_context(|| format!("Failed to run: {} {}", program, args.join(" ")))?;

    if !status.success() {
        anyhow::bail!("Command failed: {} {}", program, args.join(" "));
    }

    Ok(())
}
