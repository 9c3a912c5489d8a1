use anyhow::{Result, anyhow};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::{instrument, warn};
use xcb::{
    Connection, Xid,
    x::{self, ATOM_ANY, Atom, GetProperty, GrabServer, InternAtom, UngrabServer, Window},
};

use super::{WindowIdentity, WindowProbe};

/// Used when the window doesn't expose `_NET_WM_PID` or the process is already gone.
const UNKNOWN_APPLICATION: &str = "unknown";

fn intern_atom(conn: &Connection, name: &[u8]) -> Result<Atom> {
    let reply = conn.wait_for_reply(conn.send_request(&InternAtom {
        only_if_exists: false,
        name,
    }))?;
    Ok(reply.atom())
}

fn get_pid(conn: &Connection, window: Window, pid_atom: Atom) -> Result<Option<u32>> {
    let result = conn.wait_for_reply(conn.send_request(&GetProperty {
        delete: false,
        window,
        property: pid_atom,
        r#type: ATOM_ANY,
        long_offset: 0,
        long_length: 1,
    }))?;
    Ok(result.value::<u32>().first().copied())
}

fn get_active_window(
    conn: &Connection,
    root: Window,
    active_window_atom: Atom,
) -> Result<Option<Window>> {
    let result = conn.wait_for_reply(conn.send_request(&GetProperty {
        delete: false,
        window: root,
        property: active_window_atom,
        r#type: ATOM_ANY,
        long_offset: 0,
        long_length: 1,
    }))?;
    // Window managers report 0 when nothing has focus, e.g. on an empty desktop.
    Ok(result
        .value::<Window>()
        .first()
        .copied()
        .filter(|window| !window.is_none()))
}

fn get_name(conn: &Connection, window: Window, wm_name_atom: Atom) -> Result<String> {
    let wm_name = conn.wait_for_reply(conn.send_request(&x::GetProperty {
        delete: false,
        window,
        property: wm_name_atom,
        r#type: x::ATOM_ANY,
        long_offset: 0,
        long_length: 1024,
    }))?;
    Ok(String::from_utf8_lossy(wm_name.value::<u8>()).into_owned())
}

pub struct LinuxWindowProbe {
    connection: Connection,
    preferred_screen: usize,
    active_window_atom: Atom,
    window_name_atom: Atom,
    pid_atom: Atom,
    system: System,
}

impl LinuxWindowProbe {
    pub fn new() -> Result<Self> {
        let (connection, preferred_screen) = xcb::Connection::connect(None)?;
        let preferred_screen = usize::try_from(preferred_screen)
            .map_err(|_| anyhow!("X server returned invalid screen {preferred_screen}"))?;
        let active_window_atom = intern_atom(&connection, b"_NET_ACTIVE_WINDOW")?;
        let window_name_atom = intern_atom(&connection, b"_NET_WM_NAME")?;
        let pid_atom = intern_atom(&connection, b"_NET_WM_PID")?;
        Ok(Self {
            connection,
            preferred_screen,
            active_window_atom,
            window_name_atom,
            pid_atom,
            system: System::new(),
        })
    }

    fn get_process_name(&mut self, id: u32) -> Option<String> {
        let pid = Pid::from_u32(id);
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_exe(sysinfo::UpdateKind::OnlyIfNotSet),
        );
        let process = self.system.process(pid)?;
        process
            .exe()
            .and_then(|v| v.to_str())
            .map(|v| v.to_string())
    }

    #[instrument(skip(self))]
    fn get_active_inner(&mut self) -> Result<Option<WindowIdentity>> {
        let setup = self.connection.get_setup();

        // Currently the application only supports 1 x11 screen.
        let root = setup
            .roots()
            .nth(self.preferred_screen)
            .ok_or_else(|| anyhow!("Screen {} is not available", self.preferred_screen))?
            .root();

        let Some(active_window) =
            get_active_window(&self.connection, root, self.active_window_atom)?
        else {
            return Ok(None);
        };
        let title = get_name(&self.connection, active_window, self.window_name_atom)?;
        let app_name = match get_pid(&self.connection, active_window, self.pid_atom)? {
            Some(pid) => self.get_process_name(pid),
            None => None,
        }
        .unwrap_or_else(|| {
            warn!("Couldn't resolve the process of window {active_window:?}");
            UNKNOWN_APPLICATION.to_string()
        });

        Ok(Some(WindowIdentity {
            id: u64::from(active_window.resource_id()),
            title: title.into(),
            app_name: app_name.into(),
            url: None,
        }))
    }
}

impl WindowProbe for LinuxWindowProbe {
    #[instrument(skip(self))]
    fn get_active_window(&mut self) -> Result<Option<WindowIdentity>> {
        let _ = self.connection.send_request(&GrabServer {});

        let result = self.get_active_inner();
        let _ = self.connection.send_request(&UngrabServer {});
        result
    }
}
