use anyhow::{Result, anyhow};
use tracing::error;
use windows::{
    Win32::{
        Foundation::{BOOL, CloseHandle, GetLastError, HANDLE, HWND},
        System::{
            Diagnostics::Debug::{
                FORMAT_MESSAGE_FROM_SYSTEM, FORMAT_MESSAGE_IGNORE_INSERTS, FormatMessageW,
            },
            SystemServices::{LANG_ENGLISH, SUBLANG_ENGLISH_US},
            Threading::{
                OpenProcess, PROCESS_NAME_WIN32, PROCESS_QUERY_INFORMATION, PROCESS_VM_READ,
                QueryFullProcessImageNameW,
            },
        },
        UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowTextW, GetWindowThreadProcessId},
    },
    core::PWSTR,
};

use super::{WindowIdentity, WindowProbe};

fn last_error_message() -> Option<String> {
    let err = unsafe { GetLastError() };
    let mut message_buffer = [0u16; 2048];
    let size = unsafe {
        FormatMessageW(
            FORMAT_MESSAGE_FROM_SYSTEM | FORMAT_MESSAGE_IGNORE_INSERTS,
            None,
            err.0,
            LANG_ENGLISH | (SUBLANG_ENGLISH_US << 10),
            PWSTR::from_raw(message_buffer.as_mut_ptr()),
            2048,
            None,
        )
    };
    (size != 0).then(|| String::from_utf16_lossy(&message_buffer[0..size as usize]))
}

#[tracing::instrument]
pub fn get_active() -> Result<Option<WindowIdentity>> {
    let window = unsafe { GetForegroundWindow() };

    // Happens when the desktop is locked or a window is losing activation.
    if window.is_invalid() {
        return Ok(None);
    }

    let mut process_id = 0u32;
    unsafe { GetWindowThreadProcessId(window, Some(&mut process_id)) };
    if process_id == 0 {
        return Err(match last_error_message() {
            Some(message) => anyhow!("Failed to get active window process {message}"),
            None => anyhow!("Failed to get active window process"),
        });
    }
    let process_handle = unsafe {
        OpenProcess(
            PROCESS_QUERY_INFORMATION | PROCESS_VM_READ,
            BOOL::from(false),
            process_id,
        )
    }
    .inspect_err(|e| error!("Failed to open process {e:?}"))?;

    let mut text: [u16; 4096] = [0; 4096];
    let app_name = unsafe { get_window_process_path(process_handle, &mut text) }
        .inspect_err(|e| error!("Failed to get window process path {e:?}"));
    let title = unsafe { get_window_title(window, &mut text) };

    unsafe { CloseHandle(process_handle) }
        .inspect_err(|e| error!("Failed to close handle {e:?}"))?;

    Ok(Some(WindowIdentity {
        id: window.0 as usize as u64,
        title: title.into(),
        app_name: app_name?.into(),
        url: None,
    }))
}

unsafe fn get_window_process_path(process_handle: HANDLE, text: &mut [u16]) -> Result<String> {
    unsafe {
        let mut length = text.len() as u32;
        QueryFullProcessImageNameW(
            process_handle,
            PROCESS_NAME_WIN32,
            windows::core::PWSTR(text.as_mut_ptr()),
            &mut length,
        )?;
        Ok(String::from_utf16_lossy(&text[..length as usize]))
    }
}

unsafe fn get_window_title(window_handle: HWND, text: &mut [u16]) -> String {
    let len = unsafe { GetWindowTextW(window_handle, text) };
    String::from_utf16_lossy(&text[..len.max(0) as usize])
}

#[derive(Default)]
pub struct WindowsWindowProbe {}

impl WindowsWindowProbe {
    pub fn new() -> Self {
        Self {}
    }
}

impl WindowProbe for WindowsWindowProbe {
    fn get_active_window(&mut self) -> Result<Option<WindowIdentity>> {
        get_active().inspect_err(|e| error!("Failed to get active window {e:?}"))
    }
}
