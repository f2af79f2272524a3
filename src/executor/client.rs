// restoretool/src/executor/client.rs
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::config::{AppConfig, ClientMode};
use crate::errors::AppError;
use crate::utils::find_executable;

/// What the client tool reported for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub status: String,
    /// stdout followed by stderr.
    pub combined: String,
}

/// The capability "run this SQL against the database". Implementations decide
/// how the database is reached; callers only look at success and output.
///
/// `Err` is reserved for failures to run the client at all (spawn, I/O,
/// timeout). A client that ran and exited non-zero is `Ok` with `success == false`.
pub trait SqlRunner: Send + Sync + 'static {
    fn run(&self, sql: Vec<u8>) -> impl Future<Output = Result<CommandOutput, AppError>> + Send;
}

/// Pipes SQL into the `mysql` client, either on this host or inside a container.
#[derive(Clone)]
pub struct CommandRunner {
    program: PathBuf,
    args: Vec<String>,
    password: String,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for CommandRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRunner")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl CommandRunner {
    /// Resolves the executable on PATH and builds the fixed argument list.
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let (program_name, args) = invocation(config);
        let program = find_executable(&program_name)?;

        Ok(CommandRunner {
            program,
            args,
            password: config.credentials.password.clone(),
            timeout: config.command_timeout,
        })
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env("MYSQL_PWD", &self.password)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run_to_completion(&self, sql: Vec<u8>) -> Result<CommandOutput, AppError> {
        let mut child = self.build_command().spawn()?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("client stdin was not captured"))?;

        // Feed stdin while draining stdout/stderr so neither pipe can fill up and stall.
        let feed = async move {
            stdin.write_all(&sql).await?;
            stdin.shutdown().await
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;

        if let Err(e) = fed {
            // The client quit before reading everything; its exit status explains why.
            if e.kind() != io::ErrorKind::BrokenPipe {
                return Err(e.into());
            }
        }

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            combined,
        })
    }
}

impl SqlRunner for CommandRunner {
    async fn run(&self, sql: Vec<u8>) -> Result<CommandOutput, AppError> {
        match self.timeout {
            None => self.run_to_completion(sql).await,
            Some(limit) => match timeout(limit, self.run_to_completion(sql)).await {
                Ok(result) => result,
                // Dropping the future drops the child, and kill_on_drop reaps it.
                Err(_) => Err(AppError::Io(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("client command timed out after {} seconds", limit.as_secs()),
                ))),
            },
        }
    }
}

/// Program name and arguments for the configured reachability mode.
fn invocation(config: &AppConfig) -> (String, Vec<String>) {
    let client_args = client_arguments(config);
    match config.client.mode {
        ClientMode::Local => (config.client.binary.clone(), client_args),
        ClientMode::Docker => {
            let mut args = vec![
                "exec".to_string(),
                "-i".to_string(),
                // Forwarded from the docker CLI's own environment, so the
                // password never appears in an argument list.
                "-e".to_string(),
                "MYSQL_PWD".to_string(),
                config.client.container.clone(),
                config.client.binary.clone(),
            ];
            args.extend(client_args);
            ("docker".to_string(), args)
        }
    }
}

fn client_arguments(config: &AppConfig) -> Vec<String> {
    let creds = &config.credentials;
    let mut args = vec!["-u".to_string(), creds.user.clone()];
    if let Some(host) = &creds.host {
        args.push("-h".to_string());
        args.push(host.clone());
    }
    if let Some(port) = creds.port {
        args.push("-P".to_string());
        args.push(port.to_string());
    }
    args.push(creds.database.clone());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientConfig, DatabaseCredentials};

    fn config_with(mode: ClientMode, host: Option<&str>, port: Option<u16>) -> AppConfig {
        AppConfig {
            restore_path: PathBuf::from("dumps"),
            modify_dir: PathBuf::from("./modify"),
            max_concurrent_restores: 4,
            log_file: PathBuf::from("test.log"),
            command_timeout: None,
            client: ClientConfig {
                mode,
                container: "mysql".to_string(),
                binary: "mysql".to_string(),
            },
            credentials: DatabaseCredentials {
                user: "app".to_string(),
                password: "hunter2".to_string(),
                database: "shop".to_string(),
                host: host.map(str::to_string),
                port,
            },
        }
    }

    fn shell_runner(script: &str, limit: Option<Duration>) -> CommandRunner {
        CommandRunner {
            program: PathBuf::from("sh"),
            args: vec!["-c".to_string(), script.to_string()],
            password: "hunter2".to_string(),
            timeout: limit,
        }
    }

    #[test]
    fn test_client_arguments_never_contain_password() {
        let config = config_with(ClientMode::Local, Some("db.internal"), Some(3307));
        let args = client_arguments(&config);
        assert_eq!(args, vec!["-u", "app", "-h", "db.internal", "-P", "3307", "shop"]);
        assert!(!args.iter().any(|a| a.contains("hunter2")));
    }

    #[test]
    fn test_docker_invocation_forwards_password_by_name() {
        let mut config = config_with(ClientMode::Docker, Some("127.0.0.1"), None);
        config.client.container = "shop-db".to_string();
        config.client.binary = "/usr/bin/mysql".to_string();

        let (program, args) = invocation(&config);

        assert_eq!(program, "docker");
        assert_eq!(
            args,
            vec![
                "exec", "-i", "-e", "MYSQL_PWD", "shop-db", "/usr/bin/mysql", "-u", "app", "-h",
                "127.0.0.1", "shop",
            ]
        );
        assert!(!args.iter().any(|a| a.contains("hunter2")));
    }

    #[test]
    fn test_local_invocation_runs_the_client_directly() {
        let config = config_with(ClientMode::Local, None, Some(3307));

        let (program, args) = invocation(&config);

        assert_eq!(program, "mysql");
        assert_eq!(args, vec!["-u", "app", "-P", "3307", "shop"]);
        assert!(!args.iter().any(|a| a.contains("hunter2")));
    }

    #[test]
    fn test_client_arguments_minimal() {
        let config = config_with(ClientMode::Docker, None, None);
        assert_eq!(client_arguments(&config), vec!["-u", "app", "shop"]);
    }

    #[tokio::test]
    async fn test_stdin_is_piped_and_output_combined() -> anyhow::Result<()> {
        let runner = shell_runner("cat; echo oops >&2", None);
        let output = runner.run(b"SELECT 1;\n".to_vec()).await?;
        assert!(output.success);
        assert_eq!(output.combined, "SELECT 1;\noops\n");
        Ok(())
    }

    #[tokio::test]
    async fn test_password_reaches_child_environment() -> anyhow::Result<()> {
        let runner = shell_runner("cat >/dev/null; printf %s \"$MYSQL_PWD\"", None);
        let output = runner.run(Vec::new()).await?;
        assert_eq!(output.combined, "hunter2");
        Ok(())
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_reported_not_raised() -> anyhow::Result<()> {
        let runner = shell_runner("cat >/dev/null; echo 'ERROR 1146' >&2; exit 1", None);
        let output = runner.run(b"SELECT * FROM missing;".to_vec()).await?;
        assert!(!output.success);
        assert!(output.combined.contains("ERROR 1146"));
        Ok(())
    }

    #[tokio::test]
    async fn test_spawn_failure_is_an_error() {
        let runner = CommandRunner {
            program: PathBuf::from("/nonexistent/restoretool/mysql"),
            args: Vec::new(),
            password: String::new(),
            timeout: None,
        };
        assert!(matches!(runner.run(Vec::new()).await, Err(AppError::Io(_))));
    }

    #[tokio::test]
    async fn test_hung_command_times_out() {
        let runner = shell_runner("sleep 5", Some(Duration::from_millis(100)));
        match runner.run(Vec::new()).await {
            Err(AppError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::TimedOut),
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
