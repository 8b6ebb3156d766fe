//! Windows backend, backed by the firmware environment variable API.
//!
//! Reading or writing firmware variables needs the
//! `SeSystemEnvironmentPrivilege` on the process token. The privilege is
//! acquired on first use and a flag on the store instance remembers the
//! outcome, so repeated operations skip the token dance. Keeping the flag
//! on the instance (not in a module static) lets multiple stores coexist in
//! tests.

use std::cell::Cell;
use std::io;
use std::iter::once;
use std::mem;
use std::ptr;

use winapi::shared::winerror::{
    ERROR_ACCESS_DENIED, ERROR_ENVVAR_NOT_FOUND, ERROR_INSUFFICIENT_BUFFER,
    ERROR_INVALID_FUNCTION, ERROR_NOT_ALL_ASSIGNED, ERROR_PRIVILEGE_NOT_HELD,
};
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::handleapi::CloseHandle;
use winapi::um::processthreadsapi::{GetCurrentProcess, OpenProcessToken};
use winapi::um::securitybaseapi::AdjustTokenPrivileges;
use winapi::um::winbase::{
    GetFirmwareEnvironmentVariableExW, LookupPrivilegeValueW, SetFirmwareEnvironmentVariableW,
};
use winapi::um::winnt::{
    HANDLE, LUID, LUID_AND_ATTRIBUTES, SE_PRIVILEGE_ENABLED, TOKEN_ADJUST_PRIVILEGES,
    TOKEN_PRIVILEGES,
};

use crate::error::{Error, Result};
use crate::varstore::VariableStore;

/// The UEFI global namespace GUID in the brace form the Win32 API expects.
const GLOBAL_GUID_BRACED: &str = "{8BE4DF61-93CA-11D2-AA0D-00E098032B8C}";

/// Initial read buffer. The API offers no length query, so reads probe with
/// a generous bound and grow while the platform reports truncation.
const INITIAL_READ_BUFFER: usize = 4096;

pub struct WindowsStore {
    privileges_raised: Cell<bool>,
}

impl WindowsStore {
    pub fn new() -> Self {
        Self {
            privileges_raised: Cell::new(false),
        }
    }

    fn ensure_privileges(&self) -> Result<()> {
        if self.privileges_raised.get() {
            return Ok(());
        }
        raise_system_environment_privilege()
            .map_err(|e| Error::PermissionDenied(format!("SeSystemEnvironmentPrivilege: {e}")))?;
        self.privileges_raised.set(true);
        Ok(())
    }
}

impl Default for WindowsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableStore for WindowsStore {
    fn read(&self, name: &str) -> Result<(Vec<u8>, u32)> {
        self.ensure_privileges()?;
        let name_w = wide(name);
        let guid_w = wide(GLOBAL_GUID_BRACED);

        let mut buffer = vec![0u8; INITIAL_READ_BUFFER];
        loop {
            let mut attributes: u32 = 0;
            let stored = unsafe {
                GetFirmwareEnvironmentVariableExW(
                    name_w.as_ptr(),
                    guid_w.as_ptr(),
                    buffer.as_mut_ptr().cast(),
                    buffer.len() as u32,
                    &mut attributes,
                )
            };
            if stored > 0 {
                buffer.truncate(stored as usize);
                return Ok((buffer, attributes));
            }
            match unsafe { GetLastError() } {
                ERROR_INSUFFICIENT_BUFFER => buffer.resize(buffer.len() * 2, 0),
                code => return Err(map_error(name, code)),
            }
        }
    }

    fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        self.ensure_privileges()?;
        let name_w = wide(name);
        let guid_w = wide(GLOBAL_GUID_BRACED);

        let ok = unsafe {
            SetFirmwareEnvironmentVariableW(
                name_w.as_ptr(),
                guid_w.as_ptr(),
                data.as_ptr() as *mut _,
                data.len() as u32,
            )
        };
        if ok == 0 {
            return Err(map_error(name, unsafe { GetLastError() }));
        }
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<()> {
        // Deletion is a zero-length write on this platform. Probe first so
        // deleting an absent variable reports NotFound.
        self.read(name)?;
        let name_w = wide(name);
        let guid_w = wide(GLOBAL_GUID_BRACED);

        let ok = unsafe {
            SetFirmwareEnvironmentVariableW(name_w.as_ptr(), guid_w.as_ptr(), ptr::null_mut(), 0)
        };
        if ok == 0 {
            return Err(map_error(name, unsafe { GetLastError() }));
        }
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.read(name).is_ok()
    }
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(once(0)).collect()
}

fn map_error(name: &str, code: u32) -> Error {
    match code {
        ERROR_ENVVAR_NOT_FOUND => Error::NotFound(name.to_string()),
        ERROR_ACCESS_DENIED | ERROR_PRIVILEGE_NOT_HELD => {
            Error::PermissionDenied(name.to_string())
        }
        ERROR_INVALID_FUNCTION => Error::Unsupported("firmware variables are not exposed"),
        _ => Error::Io(io::Error::from_raw_os_error(code as i32)),
    }
}

/// Enable `SeSystemEnvironmentPrivilege` on the current process token.
fn raise_system_environment_privilege() -> io::Result<()> {
    unsafe {
        let mut token: HANDLE = ptr::null_mut();
        if OpenProcessToken(GetCurrentProcess(), TOKEN_ADJUST_PRIVILEGES, &mut token) == 0 {
            return Err(io::Error::last_os_error());
        }

        let result = (|| {
            let privilege_name = wide("SeSystemEnvironmentPrivilege");
            let mut luid: LUID = mem::zeroed();
            if LookupPrivilegeValueW(ptr::null(), privilege_name.as_ptr(), &mut luid) == 0 {
                return Err(io::Error::last_os_error());
            }

            let mut privileges = TOKEN_PRIVILEGES {
                PrivilegeCount: 1,
                Privileges: [LUID_AND_ATTRIBUTES {
                    Luid: luid,
                    Attributes: SE_PRIVILEGE_ENABLED,
                }],
            };
            if AdjustTokenPrivileges(
                token,
                0,
                &mut privileges,
                0,
                ptr::null_mut(),
                ptr::null_mut(),
            ) == 0
            {
                return Err(io::Error::last_os_error());
            }
            // AdjustTokenPrivileges succeeds even when it assigned nothing.
            if GetLastError() == ERROR_NOT_ALL_ASSIGNED {
                return Err(io::Error::from_raw_os_error(ERROR_NOT_ALL_ASSIGNED as i32));
            }
            Ok(())
        })();

        CloseHandle(token);
        result
    }
}
