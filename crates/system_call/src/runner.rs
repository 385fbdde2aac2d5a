//! 子进程运行器

use std::io;
use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, info, instrument, warn};

use crate::error::SystemCallError;

const READ_CHUNK: usize = 1024;

#[cfg(windows)]
const DEFAULT_SHELL: (&str, &str) = ("cmd", "/C");
#[cfg(not(windows))]
const DEFAULT_SHELL: (&str, &str) = ("sh", "-c");

type CallResult = Result<SystemCallOutput, SystemCallError>;

/// 子进程结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemCallOutput {
    /// 累积的 stdout 文本
    pub output: String,
    /// 输出中是否出现目标响应
    pub matched: bool,
    /// 退出码；被信号终止或因 stop_on_match 提前结束时为 None
    pub exit_code: Option<i32>,
}

/// 子进程调用描述
#[derive(Debug, Clone)]
pub struct SystemCall {
    command: String,
    target: String,
    stop_on_match: bool,
    shell: String,
    shell_flag: String,
}

impl SystemCall {
    pub fn new(command: impl Into<String>, target_response: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            target: target_response.into(),
            stop_on_match: false,
            shell: DEFAULT_SHELL.0.to_string(),
            shell_flag: DEFAULT_SHELL.1.to_string(),
        }
    }

    /// 匹配到目标后停止读取并终止进程
    pub fn stop_on_match(mut self, stop: bool) -> Self {
        self.stop_on_match = stop;
        self
    }

    /// 替换 shell 程序（参数风格沿用平台默认）
    pub fn shell(mut self, program: impl Into<String>) -> Self {
        self.shell = program.into();
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn target_response(&self) -> &str {
        &self.target
    }

    /// 在后台任务中启动
    ///
    /// 必须在 tokio 运行时内调用。
    pub fn spawn(self) -> SystemCallHandle {
        let (result_tx, result_rx) = oneshot::channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let command = self.command.clone();

        tokio::spawn(async move {
            let result = self.run(cancel_rx).await;
            match &result {
                Ok(out) => info!(
                    command = %self.command,
                    matched = out.matched,
                    exit_code = ?out.exit_code,
                    "system call finished"
                ),
                Err(e) if e.is_cancelled() => debug!(command = %self.command, "system call cancelled"),
                Err(e) => warn!(command = %self.command, error = %e, "system call failed"),
            }
            // 句柄已被丢弃时无人接收
            let _ = result_tx.send(result);
        });

        SystemCallHandle {
            command,
            result_rx,
            cancel_tx: Some(cancel_tx),
            finished: None,
        }
    }

    #[instrument(name = "system_call", skip(self, cancel_rx), fields(command = %self.command))]
    async fn run(&self, mut cancel_rx: oneshot::Receiver<()>) -> CallResult {
        let mut child = Command::new(&self.shell)
            .arg(&self.shell_flag)
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SystemCallError::LaunchFailed {
                command: self.command.clone(),
                source,
            })?;
        debug!(pid = ?child.id(), "process launched");

        let Some(mut stdout) = child.stdout.take() else {
            return Err(self.io_fault(io::Error::other("stdout was not captured")));
        };

        let mut raw = Vec::new();
        let mut matched = false;
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            tokio::select! {
                _ = &mut cancel_rx => return Err(self.cancel(&mut child).await),
                read = stdout.read(&mut chunk) => {
                    let n = read.map_err(|e| self.io_fault(e))?;
                    if n == 0 {
                        break;
                    }
                    let searched = raw.len().saturating_sub(self.target.len());
                    raw.extend_from_slice(&chunk[..n]);
                    if !matched && contains(&raw[searched..], self.target.as_bytes()) {
                        matched = true;
                        debug!(target_response = %self.target, "target response seen");
                        if self.stop_on_match {
                            break;
                        }
                    }
                }
            }
        }

        let exit_code = if matched && self.stop_on_match {
            // 进程可能仍在运行
            child.kill().await.map_err(|e| self.io_fault(e))?;
            None
        } else {
            tokio::select! {
                _ = &mut cancel_rx => return Err(self.cancel(&mut child).await),
                status = child.wait() => status.map_err(|e| self.io_fault(e))?.code(),
            }
        };

        Ok(SystemCallOutput {
            output: String::from_utf8_lossy(&raw).into_owned(),
            matched,
            exit_code,
        })
    }

    async fn cancel(&self, child: &mut Child) -> SystemCallError {
        if let Err(e) = child.kill().await {
            warn!(error = %e, "failed to kill cancelled process");
        }
        SystemCallError::Cancelled {
            command: self.command.clone(),
        }
    }

    fn io_fault(&self, source: io::Error) -> SystemCallError {
        SystemCallError::IoFault {
            command: self.command.clone(),
            source,
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

/// 运行中的子进程句柄
///
/// 丢弃句柄会取消调用并终止子进程。
#[derive(Debug)]
pub struct SystemCallHandle {
    command: String,
    result_rx: oneshot::Receiver<CallResult>,
    cancel_tx: Option<oneshot::Sender<()>>,
    finished: Option<CallResult>,
}

impl SystemCallHandle {
    pub fn command(&self) -> &str {
        &self.command
    }

    /// 非阻塞查询结果，未完成时返回 None
    pub fn try_result(&mut self) -> Option<&CallResult> {
        if self.finished.is_none() {
            let result = match self.result_rx.try_recv() {
                Ok(result) => result,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Closed) => Err(self.lost()),
            };
            self.finished = Some(result);
        }
        self.finished.as_ref()
    }

    /// 等待完成
    pub async fn wait(self) -> CallResult {
        let Self {
            command,
            result_rx,
            cancel_tx,
            finished,
        } = self;
        if let Some(result) = finished {
            return result;
        }
        // 等待期间保持取消通道存活
        let _cancel_tx = cancel_tx;
        result_rx.await.unwrap_or_else(|_| {
            Err(SystemCallError::IoFault {
                command,
                source: io::Error::other("runner task ended without a result"),
            })
        })
    }

    /// 请求取消，子进程会被终止
    ///
    /// 已完成的调用不受影响。
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
    }

    fn lost(&self) -> SystemCallError {
        SystemCallError::IoFault {
            command: self.command.clone(),
            source: io::Error::other("runner task ended without a result"),
        }
    }
}
