use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::debug;
use uuid::Uuid;

use crate::core::error::{io_err, LauncherError, LauncherResult};

/// Run `program` to completion in `cwd`. Any non-zero exit becomes
/// `ExternalProgram` carrying both output streams.
pub(crate) async fn run_program<I, S>(program: &Path, args: I, cwd: &Path) -> LauncherResult<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
    let command_line = std::iter::once(program.as_os_str())
        .chain(args.iter().map(|a| a.as_os_str()))
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ");
    debug!("Running {}", command_line);

    let output = Command::new(program)
        .args(&args)
        .current_dir(cwd)
        .output()
        .await
        .map_err(|source| LauncherError::ExternalProgram {
            command: command_line.clone(),
            code: None,
            stdout: String::new(),
            stderr: source.to_string(),
        })?;

    if !output.status.success() {
        return Err(LauncherError::ExternalProgram {
            command: command_line,
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(())
}

/// Scratch directory under the system temp dir, removed on drop.
pub(crate) struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub(crate) fn create(label: &str) -> LauncherResult<Self> {
        let path = std::env::temp_dir().join(format!("cubelaunch-{}-{}", label, Uuid::new_v4()));
        std::fs::create_dir_all(&path).map_err(io_err(&path))?;
        Ok(Self { path })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

/// `Main-Class` from a jar's `META-INF/MANIFEST.MF`, following continuation lines.
pub(crate) fn read_main_class_from_jar(path: &Path) -> LauncherResult<String> {
    let file = std::fs::File::open(path).map_err(io_err(path))?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut manifest = archive.by_name("META-INF/MANIFEST.MF").map_err(|e| {
        LauncherError::Loader(format!("Manifest not found in {}: {}", path.display(), e))
    })?;

    let mut text = String::new();
    manifest.read_to_string(&mut text)?;

    let mut main_class: Option<String> = None;
    let mut in_main_class = false;
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix(' ') {
            if in_main_class {
                if let Some(value) = &mut main_class {
                    value.push_str(rest.trim_end());
                }
            }
            continue;
        }

        in_main_class = false;
        if let Some((key, value)) = line.split_once(':') {
            if key.trim() == "Main-Class" {
                main_class = Some(value.trim().to_string());
                in_main_class = true;
            }
        }
    }

    main_class.ok_or_else(|| {
        LauncherError::Loader(format!("Main-Class missing in jar {}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn main_class_spans_continuation_lines() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("proc.jar");
        {
            let mut zip = zip::ZipWriter::new(std::fs::File::create(&jar).unwrap());
            zip.start_file("META-INF/MANIFEST.MF", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"Manifest-Version: 1.0\r\nMain-Class: net.minecraftforge.install\r\n er.SimpleInstaller\r\nCreated-By: test\r\n")
                .unwrap();
            zip.finish().unwrap();
        }
        assert_eq!(
            read_main_class_from_jar(&jar).unwrap(),
            "net.minecraftforge.installer.SimpleInstaller"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_carries_output() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_program(
            Path::new("/bin/sh"),
            ["-c", "echo out; echo err >&2; exit 3"],
            dir.path(),
        )
        .await
        .unwrap_err();
        match err {
            LauncherError::ExternalProgram {
                code, stdout, stderr, ..
            } => {
                assert_eq!(code, Some(3));
                assert_eq!(stdout.trim(), "out");
                assert_eq!(stderr.trim(), "err");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn scratch_dir_is_removed_on_drop() {
        let scratch = ScratchDir::create("test").unwrap();
        let path = scratch.path().to_path_buf();
        assert!(path.is_dir());
        drop(scratch);
        assert!(!path.exists());
    }
}
