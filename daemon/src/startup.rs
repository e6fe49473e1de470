/// Windows startup registration via the `HKCU\...\Run` registry key.
///
/// Running the daemon with `--register-startup` (idempotent) makes Windows
/// launch it automatically when the user logs in, so the agent covers the
/// whole session. `--unregister-startup` removes the registration.
///
/// On non-Windows platforms both functions only log a warning.
use anyhow::Result;
use std::path::Path;

// ── Windows implementation ─────────────────────────────────────────────────────

#[cfg(windows)]
mod imp {
    use anyhow::{bail, Result};
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::{ERROR_FILE_NOT_FOUND, ERROR_SUCCESS, WIN32_ERROR};
    use windows::Win32::System::Registry::{
        RegCloseKey, RegCreateKeyExW, RegDeleteValueW, RegOpenKeyExW, RegSetValueExW, HKEY,
        HKEY_CURRENT_USER, KEY_SET_VALUE, REG_OPTION_NON_VOLATILE, REG_SZ,
    };

    const RUN_KEY: &str = r"Software\Microsoft\Windows\CurrentVersion\Run";
    const VALUE_NAME: &str = "Launchwatch";

    fn wide(s: &str) -> Vec<u16> {
        s.encode_utf16().chain(std::iter::once(0)).collect()
    }

    /// Open `HKCU\...\Run` key, closed on drop.
    struct RunKey(HKEY);

    impl RunKey {
        fn create() -> Result<Self> {
            let path = wide(RUN_KEY);
            let mut hkey = HKEY::default();
            let err = unsafe {
                RegCreateKeyExW(
                    HKEY_CURRENT_USER,
                    PCWSTR(path.as_ptr()),
                    0,
                    PCWSTR::null(),
                    REG_OPTION_NON_VOLATILE,
                    KEY_SET_VALUE,
                    None,
                    &mut hkey,
                    None,
                )
            };
            check("RegCreateKeyExW", err)?;
            Ok(Self(hkey))
        }

        /// `None` when the key does not exist.
        fn open() -> Option<Self> {
            let path = wide(RUN_KEY);
            let mut hkey = HKEY::default();
            let err = unsafe {
                RegOpenKeyExW(
                    HKEY_CURRENT_USER,
                    PCWSTR(path.as_ptr()),
                    0,
                    KEY_SET_VALUE,
                    &mut hkey,
                )
            };
            (err == ERROR_SUCCESS).then_some(Self(hkey))
        }
    }

    impl Drop for RunKey {
        fn drop(&mut self) {
            unsafe {
                let _ = RegCloseKey(self.0);
            }
        }
    }

    fn check(call: &str, err: WIN32_ERROR) -> Result<()> {
        if err != ERROR_SUCCESS {
            bail!("{call} failed: {err:?}");
        }
        Ok(())
    }

    /// Writes `command` as the `Launchwatch` value. Overwrites any previous value.
    pub fn register(command: &str) -> Result<()> {
        let key = RunKey::create()?;
        let name = wide(VALUE_NAME);
        let data = wide(command);
        let bytes: Vec<u8> = data.iter().flat_map(|c| c.to_le_bytes()).collect();
        let err = unsafe {
            RegSetValueExW(
                key.0,
                PCWSTR(name.as_ptr()),
                0,
                REG_SZ,
                Some(bytes.as_slice()),
            )
        };
        check("RegSetValueExW", err)
    }

    /// Deletes the `Launchwatch` value. A missing key or value is not an error.
    pub fn unregister() -> Result<()> {
        let Some(key) = RunKey::open() else {
            return Ok(());
        };
        let name = wide(VALUE_NAME);
        let err = unsafe { RegDeleteValueW(key.0, PCWSTR(name.as_ptr())) };
        if err == ERROR_FILE_NOT_FOUND {
            return Ok(());
        }
        check("RegDeleteValueW", err)
    }
}

// ── Public API ─────────────────────────────────────────────────────────────────

/// Quotes the executable path and forwards an explicit config path, if any.
fn startup_command(exe: &Path, config: Option<&Path>) -> String {
    match config {
        Some(config) => format!("\"{}\" --config \"{}\"", exe.display(), config.display()),
        None => format!("\"{}\"", exe.display()),
    }
}

/// Registers the running daemon binary to launch automatically at user login.
///
/// Uses `HKCU\Software\Microsoft\Windows\CurrentVersion\Run` on Windows.
/// Idempotent: safe to call on every startup.
pub fn register_startup(config: Option<&Path>) -> Result<()> {
    let exe = std::env::current_exe()
        .map_err(|e| anyhow::anyhow!("Failed to locate daemon executable: {e}"))?;
    let command = startup_command(&exe, config);
    #[cfg(windows)]
    {
        imp::register(&command)?;
        tracing::info!("Registered in Windows startup: {command}");
    }
    #[cfg(not(windows))]
    {
        tracing::warn!("Startup registration is only supported on Windows; skipped {command}");
    }
    Ok(())
}

/// Removes the daemon from the Windows startup registry.
pub fn unregister_startup() -> Result<()> {
    #[cfg(windows)]
    {
        imp::unregister()?;
        tracing::info!("Removed from Windows startup registry");
    }
    #[cfg(not(windows))]
    {
        tracing::warn!("Startup registration is only supported on Windows");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_command_quotes_executable() {
        let cmd = startup_command(Path::new(r"C:\Program Files\Launchwatch\launchwatch.exe"), None);
        assert_eq!(cmd, r#""C:\Program Files\Launchwatch\launchwatch.exe""#);
    }

    #[test]
    fn startup_command_forwards_config_path() {
        let cmd = startup_command(
            Path::new(r"C:\lw\launchwatch.exe"),
            Some(Path::new(r"D:\cfg\games.toml")),
        );
        assert_eq!(cmd, r#""C:\lw\launchwatch.exe" --config "D:\cfg\games.toml""#);
    }
}
