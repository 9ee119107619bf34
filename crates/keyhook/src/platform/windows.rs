//! Windows low-level keyboard hook implementation.
//!
//! Registers a `WH_KEYBOARD_LL` procedure with `SetWindowsHookExW`. Windows
//! calls it on the installing thread, from inside that thread's message loop,
//! for every keyboard event on the desktop. The procedure copies the
//! `KBDLLHOOKSTRUCT` and hands it to [`crate::manager::dispatch`].
//!
//! The procedure must return quickly: Windows silently removes a low-level hook
//! whose procedure exceeds the `LowLevelHooksTimeout` limit.
//!
//! # Safety
//!
//! This module uses `unsafe` code exclusively for Windows API FFI calls.
//! All `unsafe` blocks are annotated with `// SAFETY:` comments.

#![cfg(target_os = "windows")]

use std::ffi::c_void;

use keyhook_core::RawKeyEvent;
use windows::core::Error as WinError;
use windows::Win32::Foundation::{HINSTANCE, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetMessageW, PostThreadMessageW, SetWindowsHookExW,
    TranslateMessage, UnhookWindowsHookEx, HHOOK, KBDLLHOOKSTRUCT, MSG, WH_KEYBOARD_LL, WM_QUIT,
};

use super::{HookHandle, HookPlatform};
use crate::error::{HookError, HookOperation};
use crate::manager;

/// The real Windows hook facility.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsHookPlatform;

impl HookPlatform for WindowsHookPlatform {
    fn register(&self) -> Result<HookHandle, HookError> {
        let failed = |e: WinError| HookError::PlatformRegistration {
            operation: HookOperation::Install,
            code: win32_code(&e),
        };

        // SAFETY: GetModuleHandleW(None) returns the handle of the running
        // executable and does not transfer ownership.
        let module = unsafe { GetModuleHandleW(None) }.map_err(failed)?;

        // SAFETY: `low_level_keyboard_proc` matches HOOKPROC and stays valid for
        // the life of the process. Thread id 0 hooks every thread on the desktop.
        let hook = unsafe {
            SetWindowsHookExW(
                WH_KEYBOARD_LL,
                Some(low_level_keyboard_proc),
                Some(HINSTANCE::from(module)),
                0,
            )
        }
        .map_err(failed)?;

        HookHandle::new(hook.0 as isize).ok_or(HookError::PlatformRegistration {
            operation: HookOperation::Install,
            code: 0,
        })
    }

    fn unregister(&self, handle: HookHandle) -> Result<(), HookError> {
        // SAFETY: `handle` came from a successful SetWindowsHookExW call and has
        // not been unhooked yet; the manager unregisters each handle once.
        unsafe { UnhookWindowsHookEx(to_hhook(handle)) }.map_err(|e| {
            HookError::PlatformRegistration {
                operation: HookOperation::Uninstall,
                code: win32_code(&e),
            }
        })
    }
}

/// Low-level keyboard hook procedure.
///
/// # Safety
///
/// Called by Windows on the thread that installed the hook. `l_param` points to
/// a `KBDLLHOOKSTRUCT` that is only valid for the duration of this call.
unsafe extern "system" fn low_level_keyboard_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    // Only read the payload for HC_ACTION; a negative code must be passed on
    // without interpretation.
    let raw = if n_code >= 0 && l_param.0 != 0 {
        // SAFETY: for n_code >= 0, l_param points to a valid KBDLLHOOKSTRUCT
        // owned by the OS for the duration of this call. It is copied out here.
        let kbs = &*(l_param.0 as *const KBDLLHOOKSTRUCT);
        Some(RawKeyEvent {
            vk_code: kbs.vkCode,
            scan_code: kbs.scanCode,
            flags: kbs.flags.0,
            time: kbs.time,
            extra_info: kbs.dwExtraInfo,
        })
    } else {
        None
    };

    let result = manager::dispatch(n_code, w_param.0 as u32, raw.as_ref(), |handle| {
        // SAFETY: forwards the untouched arguments to the next hook in the chain.
        CallNextHookEx(handle.map(to_hhook), n_code, w_param, l_param).0
    });
    LRESULT(result)
}

fn to_hhook(handle: HookHandle) -> HHOOK {
    HHOOK(handle.get() as *mut c_void)
}

/// Extracts the Win32 error code from a `windows` error.
///
/// Win32 failures arrive wrapped as `HRESULT_FROM_WIN32` (`0x8007xxxx`); any
/// other HRESULT is reported as-is.
fn win32_code(error: &WinError) -> u32 {
    let hresult = error.code().0 as u32;
    if hresult & 0xFFFF_0000 == 0x8007_0000 {
        hresult & 0xFFFF
    } else {
        hresult
    }
}

// ── Message loop helpers for hosts ────────────────────────────────────────────

/// Identifier of the calling thread, for [`post_quit`].
pub fn current_thread_id() -> u32 {
    // SAFETY: GetCurrentThreadId has no preconditions.
    unsafe { GetCurrentThreadId() }
}

/// Pumps messages on the calling thread until `WM_QUIT` arrives.
///
/// Low-level hook callbacks are delivered from inside this loop, so the thread
/// that installed the hook must run it.
pub fn run_message_loop() {
    let mut msg = MSG::default();
    // SAFETY: Standard Win32 GetMessage/DispatchMessage loop pattern. GetMessageW
    // returns -1 on error, which also ends the loop.
    unsafe {
        while GetMessageW(&mut msg, None, 0, 0).0 > 0 {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

/// Asks the message loop on `thread_id` to exit.
///
/// Returns the Win32 error code if the message could not be posted.
pub fn post_quit(thread_id: u32) -> Result<(), u32> {
    // SAFETY: PostThreadMessageW only enqueues a message; an invalid thread id
    // is reported as an error.
    unsafe { PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) }
        .map_err(|e| win32_code(&e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use windows::core::HRESULT;

    #[test]
    fn test_win32_code_unwraps_hresult_from_win32() {
        // HRESULT_FROM_WIN32(ERROR_ACCESS_DENIED)
        let err = WinError::from(HRESULT(0x8007_0005_u32 as i32));
        assert_eq!(win32_code(&err), 5);
    }

    #[test]
    fn test_handle_round_trips_through_hhook() {
        let handle = HookHandle::new(0x1234).expect("non-zero");
        assert_eq!(to_hhook(handle).0 as isize, 0x1234);
    }
}
