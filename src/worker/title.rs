//! Process naming for `ps`/`top`.

/// Renames the current process (Linux only; the kernel keeps 15 bytes).
#[cfg(target_os = "linux")]
pub(crate) fn set_process_title(title: &str) {
    use std::ffi::CString;

    let Ok(name) = CString::new(title) else {
        tracing::warn!(title, "process title contains a NUL byte");
        return;
    };
    if let Err(err) = nix::sys::prctl::set_name(&name) {
        tracing::warn!(title, error = %err, "failed to set process title");
    }
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn set_process_title(title: &str) {
    tracing::debug!(title, "process titles are not supported on this platform");
}
