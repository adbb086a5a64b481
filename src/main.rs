use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use diff_core::cli::{Cli, Commands, Config};
use diff_core::diff::{apply, create, read_header};

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Create {
            file1,
            file2,
            diff_dir,
            diff_ext_name,
            static_time,
            quiet,
        } => {
            let mut options = config.create;
            if let Some(ext) = diff_ext_name {
                options = options.with_extension_name(ext)?;
            }
            if static_time {
                options = options.with_static_time(true);
            }

            match create(&file1, &file2, &diff_dir, &options) {
                Ok(path) => {
                    if !quiet {
                        println!("差异文件已生成: {}", path.display());
                    }
                }
                Err(e) if e.is_no_difference() => {
                    if !quiet {
                        println!("{}", e);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Apply {
            diff_file,
            file,
            dry_run,
            quiet,
        } => {
            let mut options = config.apply;
            if dry_run {
                options = options.with_dry_run(true);
            }

            let path = apply(&diff_file, &file, &options)?;
            if !quiet {
                println!("差异已应用到: {}", path.display());
            }
        }
        Commands::PrintHeader { diff_file } => {
            println!("{}", read_header(&diff_file)?);
        }
    }

    Ok(())
}
