// ─── Launch Task ───
// Spawns the game process from a built argv.

use std::path::Path;
use std::process::{Child, Command, Stdio};

#[cfg(target_os = "windows")]
use std::os::windows::process::CommandExt;

use tracing::{debug, info};

use crate::core::error::{LauncherError, LauncherResult};

/// Start the game. Returns right after spawning; output is piped so the
/// caller can forward or drain it.
pub fn spawn_game(argv: &[String], game_dir: &Path) -> LauncherResult<Child> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| LauncherError::Other("Launch command is empty".into()))?;

    std::fs::create_dir_all(game_dir).map_err(crate::core::error::io_err(game_dir))?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(game_dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    configure_platform_spawn(&mut cmd);

    info!("Launching {} in {:?}", program, game_dir);
    debug!("Command (copy/paste): {}", format_command_for_logs(argv));

    cmd.spawn().map_err(|e| LauncherError::ExternalProgram {
        command: program.clone(),
        code: None,
        stdout: String::new(),
        stderr: e.to_string(),
    })
}

fn configure_platform_spawn(cmd: &mut Command) {
    #[cfg(target_os = "windows")]
    {
        const CREATE_NEW_CONSOLE: u32 = 0x00000010;
        cmd.creation_flags(CREATE_NEW_CONSOLE);
        cmd.env_remove("WT_SESSION");
        cmd.env_remove("TERM");
    }
    #[cfg(not(target_os = "windows"))]
    let _ = cmd;
}

pub fn format_command_for_logs(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| shell_escape(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_escape(raw: &str) -> String {
    if raw.is_empty() {
        return "\"\"".to_string();
    }

    if raw.chars().all(|ch| {
        ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '\\' | '=')
    }) {
        return raw.to_string();
    }

    format!("\"{}\"", raw.replace('"', "\\\""))
}
