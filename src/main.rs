use std::error::Error;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cubelaunch_lib::core::auth::LaunchIdentity;
use cubelaunch_lib::core::error::LauncherError;
use cubelaunch_lib::core::launch::{command_for_installed, format_command_for_logs, spawn_game, LaunchOptions};
use cubelaunch_lib::core::loaders::{InstallContext, Installer, LoaderKind};
use cubelaunch_lib::core::package::UpdateStatus;
use cubelaunch_lib::core::progress::TracingProgress;
use cubelaunch_lib::core::state::{default_data_dir, AppState, PackageSource};
use cubelaunch_lib::core::version::Platform;
use tracing::{info, warn};

#[derive(Parser)]
#[clap(author, version, about)]
struct Args {
    /// Data directory (defaults to $CUBELAUNCH_DATA_DIR or the platform data dir)
    #[clap(long, global = true)]
    data_dir: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a package with its base game and loader
    Install { package: String },
    /// Bring an installed package to the latest index
    Update { package: String },
    /// Check installed files against the package index
    Verify { package: String },
    /// Make a package the default for status/command/launch
    Select { package: String },
    /// Show installed packages and whether updates are available
    Status { package: Option<String> },
    /// Install a game version directly into a root
    InstallVersion {
        version: String,
        #[clap(long, default_value = "vanilla")]
        loader: String,
        #[clap(long)]
        loader_version: Option<String>,
        /// Minecraft root; defaults to <data dir>/minecraft
        #[clap(long)]
        root: Option<PathBuf>,
    },
    /// Print the launch command of a package
    Command {
        package: Option<String>,
        #[clap(flatten)]
        launch: LaunchArgs,
    },
    /// Start the game for a package
    Launch {
        package: Option<String>,
        #[clap(flatten)]
        launch: LaunchArgs,
    },
}

#[derive(clap::Args)]
struct LaunchArgs {
    #[clap(long)]
    username: Option<String>,
    /// Connect to this server on start
    #[clap(long)]
    server: Option<String>,
    #[clap(long)]
    port: Option<u16>,
    #[clap(long)]
    demo: bool,
}

type CliResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

#[tokio::main]
async fn main() -> CliResult<()> {
    cubelaunch_lib::init_tracing();

    let args = Args::parse();
    let state = AppState::new(args.data_dir.unwrap_or_else(default_data_dir))?;
    let progress = TracingProgress::default();

    let ok = match args.command {
        Commands::Install { package } => {
            let source = state.package_source(&package)?;
            state.packages.install(source, &progress).await
        }
        Commands::Update { package } => {
            let source = state.package_source(&package)?;
            state.packages.update(source, &progress).await
        }
        Commands::Verify { package } => {
            let source = state.package_source(&package)?;
            let valid = state.packages.verify(source).await?;
            println!("{}: {}", package, if valid { "ok" } else { "needs update" });
            valid
        }
        Commands::Select { package } => {
            let source = state.package_source(&package)?;
            state.packages.select(source).await?;
            true
        }
        Commands::Status { package } => {
            let names = match package {
                Some(name) => vec![name],
                None => state.settings.packages.iter().map(|p| p.name.clone()).collect(),
            };
            for name in names {
                print_status(&state, state.package_source(&name)?).await;
            }
            true
        }
        Commands::InstallVersion {
            version,
            loader,
            loader_version,
            root,
        } => {
            let kind: LoaderKind = loader.parse()?;
            let root = root.unwrap_or_else(|| state.data_dir.join("minecraft"));
            let platform = Platform::current();
            let ctx = InstallContext {
                minecraft_version: &version,
                loader_version: loader_version.as_deref(),
                root: &root,
                downloader: &state.downloader,
                resolver: &state.resolver,
                endpoints: &state.settings.endpoints,
                platform: &platform,
                progress: &progress,
                java: state.settings.java_path.as_deref(),
                install_runtime: state.settings.install_java_runtime,
            };
            let result = Installer::new(kind).install(&ctx).await?;
            println!("{}", result.version_id);
            true
        }
        Commands::Command { package, launch } => {
            let (argv, _) = launch_command(&state, package, &launch).await?;
            println!("{}", format_command_for_logs(&argv));
            true
        }
        Commands::Launch { package, launch } => {
            let (argv, game_dir) = launch_command(&state, package, &launch).await?;
            let mut child = spawn_game(&argv, &game_dir)?;
            let forwarders = [
                child.stdout.take().map(|out| forward_lines(out, false)),
                child.stderr.take().map(|err| forward_lines(err, true)),
            ];
            let status = child.wait()?;
            for handle in forwarders.into_iter().flatten() {
                let _ = handle.join();
            }
            info!("Game exited with {}", status);
            status.success()
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

async fn print_status(state: &AppState, source: &PackageSource) {
    let installed = state.packages.state().await;
    let selected = installed.selected.as_deref() == Some(source.name.as_str());
    let marker = if selected { "*" } else { " " };

    let Some(entry) = installed.get(&source.name) else {
        println!("{} {}: not installed", marker, source.name);
        return;
    };
    let update = match state.packages.check_for_update(source).await {
        Ok(UpdateStatus::UpdateAvailable { remote, .. }) => format!("update available: {}", remote),
        Ok(_) => "up to date".to_string(),
        Err(e) => {
            warn!("Update check for {} failed: {}", source.name, e);
            "update check failed".to_string()
        }
    };
    println!(
        "{} {}: {} ({}, launches {}) {}",
        marker, source.name, entry.installed_version, entry.loader, entry.launch_version, update
    );
}

/// Build the argv for a package, falling back to the selected one.
async fn launch_command(
    state: &AppState,
    package: Option<String>,
    args: &LaunchArgs,
) -> CliResult<(Vec<String>, PathBuf)> {
    let name = match package {
        Some(name) => name,
        None => state
            .packages
            .state()
            .await
            .selected
            .ok_or_else(|| LauncherError::Other("No package selected".into()))?,
    };
    let version = state.packages.launch_version(&name).await?;
    let root = state.packages.install_dir(&name);
    let settings = &state.settings;

    let username = args.username.as_deref().unwrap_or(&settings.username);
    let mut jvm_arguments = vec![
        format!("-Xmx{}M", settings.max_memory_mb),
        format!("-Xms{}M", settings.min_memory_mb),
    ];
    jvm_arguments.extend(settings.jvm_arguments.iter().cloned());

    let options = LaunchOptions {
        identity: LaunchIdentity::offline(username).sanitized(),
        launcher_name: settings.launcher_name.clone(),
        executable_path: settings.java_path.clone(),
        jvm_arguments,
        game_directory: Some(root.clone()),
        custom_resolution: settings.custom_resolution,
        resolution_width: settings.window_width,
        resolution_height: settings.window_height,
        demo: args.demo,
        server: args.server.clone(),
        port: args.port,
        enable_logging_config: true,
        ..LaunchOptions::default()
    };

    let argv = command_for_installed(&version, &root, &options)?;
    Ok((argv, root))
}

fn forward_lines<R: Read + Send + 'static>(stream: R, is_stderr: bool) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for line in BufReader::new(stream).lines().map_while(Result::ok) {
            if is_stderr {
                eprintln!("{}", line);
            } else {
                println!("{}", line);
            }
        }
    })
}
