//! Bock Runtime CLI.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;

use bock_common::BockPaths;
use bock_frontend::{RunParser, parse_device};
use bock_snapshot::{LocalMounter, Mount, MounterConfig};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, bail};

/// Environment variable holding the mount point inside the child command.
pub const MOUNT_PATH_ENV: &str = "BOCK_MOUNT_PATH";

/// Bock Runtime - build-step snapshot mounting
#[derive(Parser)]
#[command(name = "bock-runtime")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Data root (defaults to $BOCK_ROOT or /var/lib/bock)
    #[arg(long, global = true, env = "BOCK_ROOT")]
    pub root: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Bock runtime commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Mount a snapshot, run a command inside it, then unmount
    Mount {
        /// Mount type (bind, rbind, overlay, tmpfs, ...)
        #[arg(short = 't', long = "type", default_value = "bind")]
        mount_type: String,

        /// Mount source
        #[arg(short, long)]
        source: PathBuf,

        /// Mount options, repeatable or comma separated
        #[arg(short = 'o', long = "option", value_delimiter = ',')]
        options: Vec<String>,

        /// Command to run in the mount point; waits for Ctrl-C when omitted
        #[arg(last = true)]
        command: Vec<String>,
    },

    /// Parse a RUN --device value and print it as JSON
    Device {
        /// Device request, e.g. `nvidia.com/gpu=all,required`
        value: String,
    },

    /// Parse the flags of a RUN instruction and print the result as JSON
    Run {
        /// Tokens following the RUN keyword
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        tokens: Vec<String>,
    },

    /// Print the effective mounter configuration
    Config,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn execute(self) -> Result<()> {
        let paths = self.root.map_or_else(BockPaths::new, BockPaths::with_root);

        match self.command {
            Commands::Mount {
                mount_type,
                source,
                options,
                command,
            } => {
                let config = MounterConfig::discover(&paths)?;
                let mount = Mount::from_parts(&mount_type, source, options);
                tracing::info!(mount = %mount, "Mounting snapshot");

                let mounter = Arc::new(LocalMounter::with_mounts(vec![mount]).with_config(&config));
                let target = {
                    let mounter = Arc::clone(&mounter);
                    tokio::task::spawn_blocking(move || mounter.mount()).await??
                };

                let outcome: Result<Option<ExitStatus>> = if command.is_empty() {
                    println!("{}", target.display());
                    tokio::signal::ctrl_c().await.map(|()| None).map_err(Into::into)
                } else {
                    run_in(&target, &command).await.map(Some)
                };

                tokio::task::spawn_blocking(move || mounter.unmount()).await??;
                tracing::info!(target = %target.display(), "Unmounted snapshot");

                match outcome? {
                    Some(status) if !status.success() => {
                        bail!("`{}` exited with {status}", command.join(" "))
                    },
                    _ => Ok(()),
                }
            }

            Commands::Device { value } => {
                let device = parse_device(&value)?;
                println!("{}", serde_json::to_string_pretty(&device)?);
                Ok(())
            }

            Commands::Run { tokens } => {
                let cmd = RunParser::default().parse(&tokens)?;
                println!("{}", serde_json::to_string_pretty(&cmd)?);
                Ok(())
            }

            Commands::Config => {
                let config = MounterConfig::discover(&paths)?;
                print!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
        }
    }
}

/// Run `command` with `target` as its working directory.
async fn run_in(target: &Path, command: &[String]) -> Result<ExitStatus> {
    let Some((program, args)) = command.split_first() else {
        bail!("no command given");
    };
    tracing::debug!(program = %program, cwd = %target.display(), "Running command");

    let status = tokio::process::Command::new(program)
        .args(args)
        .current_dir(target)
        .env(MOUNT_PATH_ENV, target)
        .status()
        .await?;
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn mount_options_split_on_commas() {
        let cli = Cli::parse_from([
            "bock-runtime",
            "mount",
            "-t",
            "rbind",
            "-s",
            "/src",
            "-o",
            "ro,nosuid",
            "-o",
            "nodev",
            "--",
            "ls",
            "-l",
        ]);
        let Commands::Mount {
            mount_type,
            options,
            command,
            ..
        } = cli.command
        else {
            panic!("expected mount");
        };
        assert_eq!(mount_type, "rbind");
        assert_eq!(options, vec!["ro", "nosuid", "nodev"]);
        assert_eq!(command, vec!["ls", "-l"]);
    }

    #[test]
    fn run_accepts_flag_tokens() {
        let cli = Cli::parse_from(["bock-runtime", "run", "--device=a.com/b=c", "make"]);
        let Commands::Run { tokens } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(tokens, vec!["--device=a.com/b=c", "make"]);
    }

    #[tokio::test]
    async fn run_in_reports_status() {
        let dir = tempfile::tempdir().unwrap();
        let ok = run_in(dir.path(), &["true".to_string()]).await.unwrap();
        assert!(ok.success());
        let failed = run_in(dir.path(), &["false".to_string()]).await.unwrap();
        assert!(!failed.success());
    }
}
