use std::{path::Path, process::Command};

/// Returns a std::process::Command from a given command str and it's arguments
pub fn get_launch_command<'a>(
    command: &str,
    args: impl IntoIterator<Item = &'a str>,
    env_vars: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Command {
    let mut command = Command::new(command);
    command.envs(env_vars).args(args);

    command
}

/// Returns the command for running an executable, optionally through a wrapper such as `wine`
///
/// The working directory is set to the directory containing the executable, as games commonly
/// load their assets using relative paths.
pub fn get_launch_command_for_executable(executable: &Path, wrapper: &[String]) -> Command {
    let mut command = match wrapper.split_first() {
        Some((program, wrapper_args)) => {
            let mut command = get_launch_command(program, wrapper_args.iter().map(String::as_str), []);
            command.arg(executable);
            command
        }
        None => Command::new(executable),
    };

    if let Some(dir) = executable.parent().filter(|p| !p.as_os_str().is_empty()) {
        command.current_dir(dir);
    }

    command
}
