/// Process inspection: maps a process id to the path of its executable image.
///
/// The Win32 implementation opens the process with limited query rights and
/// reads its full image name; the handle is released on every path. Other
/// targets fall back to `sysinfo`.
use std::path::PathBuf;

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InspectError {
    /// The process has exited or access was denied.
    #[error("cannot open process {pid}: {reason}")]
    OpenProcess { pid: u32, reason: String },
    #[error("cannot read image name of process {pid}: {reason}")]
    QueryImageName { pid: u32, reason: String },
    #[error("process {0} not found")]
    NotFound(u32),
}

pub trait ProcessInspector: Send {
    /// Full path of the executable backing `pid`.
    fn executable_path(&mut self, pid: u32) -> Result<PathBuf, InspectError>;
}

/// Lowercase final path component, accepting both `\` and `/` separators.
pub fn executable_file_name(path: &str) -> String {
    path.rsplit(['\\', '/'])
        .next()
        .unwrap_or(path)
        .to_lowercase()
}

// ── sysinfo ───────────────────────────────────────────────────────────────────

/// Portable inspector backed by `sysinfo`, refreshing only the queried pid.
#[cfg_attr(windows, allow(dead_code))]
pub struct SysinfoInspector {
    sys: System,
}

#[cfg_attr(windows, allow(dead_code))]
impl SysinfoInspector {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }
}

impl ProcessInspector for SysinfoInspector {
    fn executable_path(&mut self, pid: u32) -> Result<PathBuf, InspectError> {
        let sys_pid = Pid::from_u32(pid);
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[sys_pid]),
            true,
            ProcessRefreshKind::new().with_exe(UpdateKind::OnlyIfNotSet),
        );
        let process = self.sys.process(sys_pid).ok_or(InspectError::NotFound(pid))?;
        match process.exe() {
            Some(exe) => Ok(exe.to_path_buf()),
            // No access to the image path; the process name is the file name.
            None => Ok(PathBuf::from(process.name())),
        }
    }
}

// ── Win32 ─────────────────────────────────────────────────────────────────────

#[cfg(windows)]
pub use imp::Win32Inspector;

#[cfg(windows)]
mod imp {
    use std::path::PathBuf;

    use windows::core::PWSTR;
    use windows::Win32::Foundation::{CloseHandle, HANDLE, MAX_PATH};
    use windows::Win32::System::Threading::{
        OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
        PROCESS_QUERY_LIMITED_INFORMATION,
    };

    use super::{InspectError, ProcessInspector};

    /// Closes the wrapped process handle on drop.
    struct ProcessHandle(HANDLE);

    impl Drop for ProcessHandle {
        fn drop(&mut self) {
            unsafe {
                let _ = CloseHandle(self.0);
            }
        }
    }

    #[derive(Default)]
    pub struct Win32Inspector;

    impl Win32Inspector {
        fn open_for_query(pid: u32) -> Result<ProcessHandle, InspectError> {
            let handle = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) }
                .map_err(|e| InspectError::OpenProcess {
                    pid,
                    reason: e.to_string(),
                })?;
            if handle.is_invalid() {
                return Err(InspectError::OpenProcess {
                    pid,
                    reason: "invalid handle".into(),
                });
            }
            Ok(ProcessHandle(handle))
        }
    }

    impl ProcessInspector for Win32Inspector {
        fn executable_path(&mut self, pid: u32) -> Result<PathBuf, InspectError> {
            let handle = Self::open_for_query(pid)?;
            let mut buffer = vec![0u16; MAX_PATH as usize * 2];
            let mut size = buffer.len() as u32;
            unsafe {
                QueryFullProcessImageNameW(
                    handle.0,
                    PROCESS_NAME_WIN32,
                    PWSTR(buffer.as_mut_ptr()),
                    &mut size,
                )
            }
            .map_err(|e| InspectError::QueryImageName {
                pid,
                reason: e.to_string(),
            })?;
            Ok(PathBuf::from(String::from_utf16_lossy(&buffer[..size as usize])))
        }
    }
}

/// Inspector appropriate for the current target.
pub fn platform_inspector() -> Box<dyn ProcessInspector> {
    #[cfg(windows)]
    {
        Box::new(Win32Inspector)
    }
    #[cfg(not(windows))]
    {
        Box::new(SysinfoInspector::new())
    }
}
