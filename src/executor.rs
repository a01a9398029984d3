use crate::error::{Error, Result};
use crate::types::CommandPlan;
use std::{
    fs::{self, File, OpenOptions},
    io::{self, Read, Write},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    sync::Mutex,
    thread,
};

const DEFAULT_SHELL: &str = "sh";

/// Runs a plan's commands in order, mirroring all output to the caller and
/// to a per-run log file.
///
/// A run goes `Idle -> Logging -> Running[i] -> Success | Failed`. If the
/// log file cannot be created the run continues with caller output only.
#[derive(Debug, Clone)]
pub struct Executor {
    logs_dir: PathBuf,
    shell: String,
}

#[derive(Debug, Clone)]
pub struct Execution {
    pub log_path: Option<PathBuf>,
    pub steps: usize,
}

impl Executor {
    pub fn new(logs_dir: impl Into<PathBuf>) -> Self {
        Self {
            logs_dir: logs_dir.into(),
            shell: DEFAULT_SHELL.to_string(),
        }
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        let shell = shell.into();
        if !shell.trim().is_empty() {
            self.shell = shell;
        }
        self
    }

    pub fn execute<W: Write + Send>(&self, plan: &CommandPlan, out: &mut W) -> Result<Execution> {
        let (file, log_path) = match open_log(&self.logs_dir) {
            Ok((file, path)) => {
                writeln!(out, "logging to {}", path.display())?;
                (Some(file), Some(path))
            }
            Err(e) => {
                log::warn!("failed to create log file: {}", e);
                writeln!(out, "warning: failed to create log file: {}", e)?;
                (None, None)
            }
        };

        let tee = Mutex::new(Tee { out, file });

        stamp(&tee, &format!("Executing plan: {}", plan.summary))?;
        if let Some(cwd) = &plan.cwd {
            stamp(&tee, &format!("Working directory: {}", cwd.display()))?;
        }

        let total = plan.commands.len();
        for (i, command) in plan.commands.iter().enumerate() {
            stamp(&tee, &format!("Step {}/{}: {}", i + 1, total, command.cmd))?;

            if let Err(e) = run_command(&self.shell, &command.cmd, plan.cwd.as_deref(), &tee) {
                stamp(&tee, &format!("Failed: {}", e))?;
                return Err(Error::StepFailed {
                    step: i + 1,
                    source: e,
                });
            }
        }

        stamp(&tee, "Plan execution completed successfully.")?;
        Ok(Execution {
            log_path,
            steps: total,
        })
    }
}

struct Tee<'a, W: Write> {
    out: &'a mut W,
    file: Option<File>,
}

impl<W: Write> Write for Tee<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.out.write_all(buf)?;
        if let Some(file) = self.file.as_mut() {
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()?;
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

fn lock<'m, 'a, W: Write>(
    tee: &'m Mutex<Tee<'a, W>>,
) -> io::Result<std::sync::MutexGuard<'m, Tee<'a, W>>> {
    tee.lock()
        .map_err(|_| io::Error::other("output writer poisoned"))
}

fn stamp<W: Write>(tee: &Mutex<Tee<'_, W>>, msg: &str) -> io::Result<()> {
    let now = chrono::Local::now().format("%H:%M:%S");
    let mut tee = lock(tee)?;
    writeln!(tee, "[{}] {}", now, msg)?;
    tee.flush()
}

fn run_command<W: Write + Send>(
    shell: &str,
    cmd: &str,
    cwd: Option<&Path>,
    tee: &Mutex<Tee<'_, W>>,
) -> io::Result<()> {
    let mut command = Command::new(shell);
    command
        .arg("-c")
        .arg(cmd)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let mut child = command.spawn()?;
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let pumped = thread::scope(|s| -> io::Result<()> {
        let stderr_pump = stderr.map(|err| s.spawn(move || pump(err, tee)));
        if let Some(out) = stdout {
            pump(out, tee)?;
        }
        if let Some(handle) = stderr_pump {
            handle
                .join()
                .map_err(|_| io::Error::other("stderr reader panicked"))??;
        }
        Ok(())
    });

    let status = child.wait()?;
    pumped?;
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!("exit status: {}", status)))
    }
}

fn pump<R: Read, W: Write>(mut reader: R, tee: &Mutex<Tee<'_, W>>) -> io::Result<()> {
    let mut buf = [0u8; 8192];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        let mut tee = lock(tee)?;
        tee.write_all(&buf[..n])?;
        tee.flush()?;
    }
}

/// Create `<dir>/<timestamp>.log`, adding `-N` if that name is taken.
fn open_log(dir: &Path) -> io::Result<(File, PathBuf)> {
    fs::create_dir_all(dir)?;
    let base = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();

    for n in 0u32.. {
        let name = if n == 0 {
            format!("{}.log", base)
        } else {
            format!("{}-{}.log", base, n)
        };
        let path = dir.join(name);
        match OpenOptions::new().append(true).create_new(true).open(&path) {
            Ok(file) => return Ok((file, path)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::other("no free log file name"))
}

/// Log files in `dir`, oldest first. Names sort by time.
pub fn list_logs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut logs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().map_or(false, |ext| ext == "log"))
        .collect();
    logs.sort();
    Ok(logs)
}
