//! FFI safety wrappers for declarations handed over by plugin libraries.

use std::ffi::CStr;
use std::os::raw::c_char;

use super::abi::{EntryFactoryFn, EntryPointRecord, PluginDeclaration, RUNTIME_ABI_VERSION, SDK_VERSION};

/// Safely converts a C string pointer to a Rust `String`.
///
/// Returns `None` if the pointer is null or not UTF-8.
pub fn c_str_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string()) }
}

/// Checks a declaration against this host's ABI and SDK versions.
pub fn check_declaration(decl: &PluginDeclaration) -> Result<(), String> {
    if decl.runtime_abi_version != RUNTIME_ABI_VERSION {
        return Err(format!(
            "runtime ABI mismatch: library declares v{}, host expects v{}",
            decl.runtime_abi_version, RUNTIME_ABI_VERSION
        ));
    }
    let host_sdk = SDK_VERSION.trim_end_matches('\0');
    match c_str_to_string(decl.sdk_version) {
        Some(v) if v == host_sdk => Ok(()),
        Some(v) => Err(format!(
            "SDK mismatch: library built against {v}, host runs {host_sdk}"
        )),
        None => Err("declaration carries no SDK version".to_string()),
    }
}

/// Entry point records of a declaration.
///
/// # Safety
/// `decl` must come from a loaded library that is still mapped, and its
/// `entries`/`entry_count` must describe a valid array.
pub unsafe fn declaration_entries(decl: &PluginDeclaration) -> &[EntryPointRecord] {
    if decl.entries.is_null() || decl.entry_count == 0 {
        return &[];
    }
    unsafe { std::slice::from_raw_parts(decl.entries, decl.entry_count) }
}

/// Looks up an entry point constructor by name.
///
/// # Safety
/// Same requirements as [`declaration_entries`].
pub unsafe fn find_entry(decl: &PluginDeclaration, name: &str) -> Option<EntryFactoryFn> {
    unsafe { declaration_entries(decl) }
        .iter()
        .find(|record| c_str_to_string(record.name).as_deref() == Some(name))
        .map(|record| record.factory)
}
