//! Hand-off to the downstream command once the environment is ready.

use crate::envfile::EnvSnapshot;
use crate::error::{Error, Result};
use std::process::{Command, ExitStatus};

/// Run `command[0]` with the remaining elements as arguments and wait for it.
///
/// The child inherits stdio and the process environment, with every entry of
/// `snapshot` exported on top.
pub fn run_command(command: &[String], snapshot: &EnvSnapshot) -> Result<ExitStatus> {
    let Some((program, args)) = command.split_first() else {
        return Err(Error::InvalidConfig("no command given".into()));
    };

    tracing::info!(program = %program, args = ?args, "starting command");

    let status = Command::new(program)
        .args(args)
        .envs(snapshot.iter())
        .status()
        .map_err(|source| Error::Spawn {
            program: program.clone(),
            source,
        })?;

    tracing::debug!(?status, "command exited");
    Ok(status)
}

/// Replace the current process with `command`.
///
/// The program takes over the process ID, so signals sent to the entrypoint
/// (for example SIGTERM from `docker stop`) reach it directly. Only returns
/// if the program could not be started.
#[cfg(unix)]
pub fn exec_command(command: &[String], snapshot: &EnvSnapshot) -> Error {
    use std::os::unix::process::CommandExt;

    let Some((program, args)) = command.split_first() else {
        return Error::InvalidConfig("no command given".into());
    };

    tracing::info!(program = %program, args = ?args, "executing command");

    let source = Command::new(program)
        .args(args)
        .envs(snapshot.iter())
        .exec();
    Error::Spawn {
        program: program.clone(),
        source,
    }
}

/// Exit code to propagate for a finished child. Signal deaths map to 1.
pub fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn cmd(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_propagates_exit_code() -> anyhow::Result<()> {
        let status = run_command(&cmd(&["sh", "-c", "exit 7"]), &EnvSnapshot::new())?;
        assert_eq!(exit_code(status), 7);
        Ok(())
    }

    #[test]
    fn test_exports_snapshot() -> anyhow::Result<()> {
        let snapshot: EnvSnapshot = [("ENVBOOT_TEST_VALUE", "hello")].into_iter().collect();
        let status = run_command(
            &cmd(&["sh", "-c", "test \"$ENVBOOT_TEST_VALUE\" = hello"]),
            &snapshot,
        )?;
        assert!(status.success());
        Ok(())
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let result = run_command(
            &cmd(&["envboot-definitely-not-a-real-program"]),
            &EnvSnapshot::new(),
        );
        assert!(matches!(result, Err(Error::Spawn { .. })));
    }

    #[test]
    fn test_empty_command_rejected() {
        assert!(run_command(&[], &EnvSnapshot::new()).is_err());
        assert!(matches!(
            exec_command(&[], &EnvSnapshot::new()),
            Error::InvalidConfig(_)
        ));
    }

    #[test]
    fn test_exec_missing_program_returns_spawn_error() {
        let err = exec_command(
            &cmd(&["envboot-definitely-not-a-real-program"]),
            &EnvSnapshot::new(),
        );
        assert!(matches!(err, Error::Spawn { .. }));
    }
}
