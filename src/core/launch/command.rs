// ─── Command Builder ───
// Turns a resolved manifest plus launch options into the final argv.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::error::LauncherResult;
use crate::core::java::java_executable;
use crate::core::loaders::logging_config_path;
use crate::core::natives::natives_dir;
use crate::core::version::{resolve_local, Argument, Platform, VersionManifest};

use super::classpath::{build_classpath, classpath_separator, safe_path_str};
use super::options::{LaunchOptions, QuickPlay};
use super::placeholders::Placeholders;

/// Java binary: explicit path, else the manifest's runtime component (or
/// `java` when that runtime is missing), else the configured default.
pub fn select_java(manifest: &VersionManifest, root: &Path, options: &LaunchOptions) -> PathBuf {
    if let Some(explicit) = &options.executable_path {
        return explicit.clone();
    }
    if let Some(runtime) = &manifest.java_version {
        return java_executable(root, &runtime.component).unwrap_or_else(|| PathBuf::from("java"));
    }
    options
        .default_executable_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("java"))
}

fn placeholder_table(
    manifest: &VersionManifest,
    root: &Path,
    options: &LaunchOptions,
    classpath: &str,
) -> Placeholders {
    let identity = options.identity.clone().sanitized();
    let natives = options
        .natives_directory
        .clone()
        .unwrap_or_else(|| natives_dir(root, &manifest.id));
    let game_dir = options
        .game_directory
        .clone()
        .unwrap_or_else(|| root.to_path_buf());
    let assets = root.join("assets");

    let mut table = Placeholders::new();
    table
        .set("natives_directory", safe_path_str(&natives))
        .set("launcher_name", options.launcher_name.as_str())
        .set("launcher_version", options.launcher_version.as_str())
        .set("classpath", classpath)
        .set("classpath_separator", classpath_separator())
        .set("library_directory", safe_path_str(&root.join("libraries")))
        .set("auth_player_name", identity.username.as_str())
        .set("auth_uuid", identity.uuid.as_str())
        .set("auth_access_token", identity.access_token.as_str())
        .set("auth_session", identity.access_token.as_str())
        .set("auth_xuid", "0")
        .set("clientid", "")
        .set("user_type", identity.user_type.as_str())
        .set("user_properties", "{}")
        .set("version_name", manifest.id.as_str())
        .set("version_type", manifest.version_type.as_deref().unwrap_or("release"))
        .set("game_directory", safe_path_str(&game_dir))
        .set("assets_root", safe_path_str(&assets))
        .set("assets_index_name", manifest.assets_name())
        .set("game_assets", safe_path_str(&assets.join("virtual").join("legacy")))
        .set("resolution_width", options.resolution_width.to_string())
        .set("resolution_height", options.resolution_height.to_string());

    match &options.quick_play {
        Some(QuickPlay::Path(v)) => table.set("quickPlayPath", v.as_str()),
        Some(QuickPlay::Singleplayer(v)) => table.set("quickPlaySingleplayer", v.as_str()),
        Some(QuickPlay::Multiplayer(v)) => table.set("quickPlayMultiplayer", v.as_str()),
        Some(QuickPlay::Realms(v)) => table.set("quickPlayRealms", v.as_str()),
        None => &mut table,
    };
    table
}

fn expand(args: &[Argument], platform: &Platform, options: &LaunchOptions, table: &Placeholders) -> Vec<String> {
    let features = options.features();
    args.iter()
        .flat_map(|arg| arg.tokens(platform, &features))
        .map(|token| table.apply(token))
        .collect()
}

/// Full launch argv for an already-resolved manifest.
pub fn build_command(
    manifest: &VersionManifest,
    root: &Path,
    options: &LaunchOptions,
    platform: &Platform,
) -> LauncherResult<Vec<String>> {
    let classpath = build_classpath(manifest, root, platform)?;
    let table = placeholder_table(manifest, root, options, &classpath);

    let mut command = vec![safe_path_str(&select_java(manifest, root, options))];
    command.extend(options.jvm_arguments.iter().cloned());

    let structured = manifest.arguments.as_ref();
    match structured.filter(|a| !a.jvm.is_empty()) {
        Some(arguments) => command.extend(expand(&arguments.jvm, platform, options, &table)),
        None => {
            command.push(format!(
                "-Djava.library.path={}",
                table.get("natives_directory").unwrap_or_default()
            ));
            command.push("-cp".into());
            command.push(classpath.clone());
        }
    }

    if options.enable_logging_config {
        if let Some(logging) = manifest.logging.as_ref().and_then(|l| l.client.as_ref()) {
            let config = logging_config_path(root, &logging.file.id);
            command.push(logging.argument.replace("${path}", &safe_path_str(&config)));
        }
    }

    command.push(manifest.main_class()?.to_string());

    match (structured.filter(|a| !a.game.is_empty()), &manifest.minecraft_arguments) {
        (Some(arguments), _) => command.extend(expand(&arguments.game, platform, options, &table)),
        (None, Some(legacy)) => {
            command.extend(legacy.split_whitespace().map(|token| table.apply(token)));
            if options.custom_resolution {
                command.push("--width".into());
                command.push(options.resolution_width.to_string());
                command.push("--height".into());
                command.push(options.resolution_height.to_string());
            }
            if options.demo {
                command.push("--demo".into());
            }
        }
        (None, None) => {}
    }

    if let Some(server) = &options.server {
        command.push("--server".into());
        command.push(server.clone());
        if let Some(port) = options.port {
            command.push("--port".into());
            command.push(port.to_string());
        }
    }
    if options.disable_multiplayer {
        command.push("--disableMultiplayer".into());
    }
    if options.disable_chat {
        command.push("--disableChat".into());
    }

    debug!("Launch command for {} has {} arguments", manifest.id, command.len());
    Ok(command)
}

/// Resolve an installed version from disk and build its command.
pub fn command_for_installed(id: &str, root: &Path, options: &LaunchOptions) -> LauncherResult<Vec<String>> {
    let manifest = resolve_local(id, root)?;
    build_command(&manifest, root, options, &Platform::current())
}
