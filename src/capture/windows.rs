//! Windows implementation of event capture using low-level hooks.
//!
//! One backend instance installs exactly one hook (keyboard or pointer) on a
//! dedicated thread and pumps that thread's message queue. Hook callbacks do
//! the minimum possible work: translate the OS payload into a [`RawInput`]
//! and `try_send` it, so capture latency never depends on the consumer.

use crate::capture::types::{PointerButton, RawInput, RawInputKind};
use crate::capture::{CaptureError, CaptureKind};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, PeekMessageW, SetWindowsHookExW, UnhookWindowsHookEx, HHOOK,
    KBDLLHOOKSTRUCT, MSG, MSLLHOOKSTRUCT, PM_REMOVE, WH_KEYBOARD_LL, WH_MOUSE_LL, WM_KEYDOWN,
    WM_KEYUP, WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MBUTTONDOWN, WM_MBUTTONUP, WM_MOUSEHWHEEL,
    WM_MOUSEMOVE, WM_MOUSEWHEEL, WM_RBUTTONDOWN, WM_RBUTTONUP, WM_SYSKEYDOWN, WM_SYSKEYUP,
};

/// The Windows event backend using a low-level hook.
pub struct WindowsBackend {
    kind: CaptureKind,
    sender: Sender<RawInput>,
    receiver: Receiver<RawInput>,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl WindowsBackend {
    /// Create a new backend for the given input channel.
    pub fn new(kind: CaptureKind) -> Self {
        // Bounded so a stalled consumer can't grow memory without limit.
        let (sender, receiver) = bounded(10_000);
        Self {
            kind,
            sender,
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }

    /// Start capturing events on a background hook thread.
    ///
    /// Hook installation failure is fatal for the backend: the error is
    /// reported synchronously and no thread is left running.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CaptureError::AlreadyRunning);
        }
        self.running.store(true, Ordering::SeqCst);

        let sender = self.sender.clone();
        let running = self.running.clone();
        let kind = self.kind;
        let (ready_tx, ready_rx) = bounded::<Result<(), CaptureError>>(1);

        let handle = thread::spawn(move || {
            let result = run_hook_loop(sender, running.clone(), kind, ready_tx);
            if let Err(e) = result {
                tracing::error!("hook loop terminated: {e}");
            }
            running.store(false, Ordering::SeqCst);
        });

        // Wait for the hook to be installed (or refused) before reporting
        // success, so registration failures surface to the caller.
        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.thread_handle = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(CaptureError::HookInstallationFailed)
            }
        }
    }

    /// Stop capturing events and unhook.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    /// Check if the backend is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the receiver for raw input events.
    pub fn receiver(&self) -> &Receiver<RawInput> {
        &self.receiver
    }

    /// A sender feeding the same channel the hooks emit on.
    pub fn injector(&self) -> Sender<RawInput> {
        self.sender.clone()
    }
}

impl Drop for WindowsBackend {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Per-hook-thread sender slot. Low-level hooks are invoked on the thread
/// that installed them, so thread-local storage avoids true globals.
thread_local! {
    static EVENT_SENDER: std::cell::RefCell<Option<Sender<RawInput>>> =
        const { std::cell::RefCell::new(None) };
}

fn emit(event: RawInput) {
    EVENT_SENDER.with(|sender| {
        if let Some(ref s) = *sender.borrow() {
            // Never block inside an OS callback; a full channel drops the event.
            let _ = s.try_send(event);
        }
    });
}

/// Map a Windows virtual-key code to a canonical key identifier.
fn key_name(vk: u32) -> String {
    match vk {
        0x08 => "backspace".to_string(),
        0x09 => "tab".to_string(),
        0x0D => "enter".to_string(),
        0x10 | 0xA0 | 0xA1 => "shift".to_string(),
        0x11 | 0xA2 | 0xA3 => "ctrl".to_string(),
        0x12 | 0xA4 | 0xA5 => "alt".to_string(),
        0x14 => "caps_lock".to_string(),
        0x1B => "esc".to_string(),
        0x20 => "space".to_string(),
        0x25 => "left".to_string(),
        0x26 => "up".to_string(),
        0x27 => "right".to_string(),
        0x28 => "down".to_string(),
        0x2E => "delete".to_string(),
        0x30..=0x39 => char::from(b'0' + (vk - 0x30) as u8).to_string(),
        0x41..=0x5A => char::from(b'a' + (vk - 0x41) as u8).to_string(),
        0x70..=0x87 => format!("f{}", vk - 0x6F),
        other => format!("vk_{other}"),
    }
}

/// Low-level keyboard hook callback.
unsafe extern "system" fn keyboard_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code >= 0 {
        let kb_struct = &*(l_param.0 as *const KBDLLHOOKSTRUCT);
        let w_param_u32 = w_param.0 as u32;
        let key = key_name(kb_struct.vkCode);

        match w_param_u32 {
            WM_KEYDOWN | WM_SYSKEYDOWN => {
                emit(RawInput::now(RawInputKind::KeyDown { key }));
            }
            WM_KEYUP | WM_SYSKEYUP => {
                emit(RawInput::now(RawInputKind::KeyUp { key }));
            }
            _ => {}
        }
    }

    CallNextHookEx(HHOOK::default(), n_code, w_param, l_param)
}

/// Low-level mouse hook callback.
unsafe extern "system" fn pointer_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code >= 0 {
        let mouse_struct = &*(l_param.0 as *const MSLLHOOKSTRUCT);
        let w_param_u32 = w_param.0 as u32;
        let x = f64::from(mouse_struct.pt.x);
        let y = f64::from(mouse_struct.pt.y);

        let kind = match w_param_u32 {
            WM_MOUSEMOVE => Some(RawInputKind::PointerMove { x, y }),
            WM_LBUTTONDOWN => Some(button(x, y, PointerButton::Left, true)),
            WM_LBUTTONUP => Some(button(x, y, PointerButton::Left, false)),
            WM_RBUTTONDOWN => Some(button(x, y, PointerButton::Right, true)),
            WM_RBUTTONUP => Some(button(x, y, PointerButton::Right, false)),
            WM_MBUTTONDOWN => Some(button(x, y, PointerButton::Middle, true)),
            WM_MBUTTONUP => Some(button(x, y, PointerButton::Middle, false)),
            WM_MOUSEWHEEL => {
                // High word of mouseData holds the wheel delta, 120 per notch.
                let delta = ((mouse_struct.mouseData >> 16) & 0xFFFF) as i16 as f64;
                Some(RawInputKind::PointerScroll {
                    x,
                    y,
                    dx: 0.0,
                    dy: delta / 120.0,
                })
            }
            WM_MOUSEHWHEEL => {
                let delta = ((mouse_struct.mouseData >> 16) & 0xFFFF) as i16 as f64;
                Some(RawInputKind::PointerScroll {
                    x,
                    y,
                    dx: delta / 120.0,
                    dy: 0.0,
                })
            }
            _ => None,
        };

        if let Some(kind) = kind {
            emit(RawInput::now(kind));
        }
    }

    CallNextHookEx(HHOOK::default(), n_code, w_param, l_param)
}

fn button(x: f64, y: f64, button: PointerButton, pressed: bool) -> RawInputKind {
    RawInputKind::PointerButton {
        x,
        y,
        button,
        pressed,
    }
}

/// Install the hook for `kind` and pump messages until `running` clears.
fn run_hook_loop(
    sender: Sender<RawInput>,
    running: Arc<AtomicBool>,
    kind: CaptureKind,
    ready: Sender<Result<(), CaptureError>>,
) -> Result<(), CaptureError> {
    EVENT_SENDER.with(|s| {
        *s.borrow_mut() = Some(sender);
    });

    unsafe {
        let hook = match kind {
            CaptureKind::Keyboard => {
                SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), None, 0)
            }
            CaptureKind::Pointer => {
                SetWindowsHookExW(WH_MOUSE_LL, Some(pointer_hook_proc), None, 0)
            }
        };

        let hook = match hook {
            Ok(h) => {
                let _ = ready.send(Ok(()));
                h
            }
            Err(_) => {
                let _ = ready.send(Err(CaptureError::HookInstallationFailed));
                return Err(CaptureError::HookInstallationFailed);
            }
        };

        // Drain the queue without blocking so the stop flag is observed
        // well within the one-second cancellation bound.
        let mut msg = MSG::default();
        while running.load(Ordering::SeqCst) {
            while PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_REMOVE).as_bool() {
                // Hooks run as part of message retrieval; nothing to dispatch.
            }
            thread::sleep(Duration::from_millis(50));
        }

        let _ = UnhookWindowsHookEx(hook);
    }

    Ok(())
}

/// Check if the process can install low-level hooks.
///
/// Low-level hooks generally work without explicit permission, but may need
/// elevated privileges in locked-down environments. Installing and removing
/// a probe hook verifies this.
pub fn check_permission() -> bool {
    unsafe {
        match SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), None, 0) {
            Ok(hook) => {
                let _ = UnhookWindowsHookEx(hook);
                true
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_name_canonical() {
        assert_eq!(key_name(0x08), "backspace");
        assert_eq!(key_name(0x20), "space");
        assert_eq!(key_name(0x1B), "esc");
        assert_eq!(key_name(0x41), "a");
        assert_eq!(key_name(0x39), "9");
        assert_eq!(key_name(0x70), "f1");
        assert_eq!(key_name(0xFF), "vk_255");
    }

    #[test]
    fn test_backend_creation() {
        let backend = WindowsBackend::new(CaptureKind::Keyboard);
        assert!(!backend.is_running());
    }
}
