//! ABI shared between the host and dynamically loaded plugins.
//!
//! A plugin library exports a single symbol:
//!
//! ```c
//! PluginDeclaration tvbox_plugin_declaration(void);
//! ```
//!
//! The declaration lists the library's entry points by name. The entry point
//! named in a bundle's metadata is looked up in that table; nothing is
//! resolved by reflection. Entry points receive the host context by pointer
//! and return an owned, type-erased [`PluginEntry`]. Because both sides
//! exchange Rust types through these pointers, a plugin must be built with
//! the same toolchain and the same `tvbox-plugin` version as the host; the
//! declaration carries both versions so mismatches are refused at load time.

use std::ffi::c_void;
use std::os::raw::c_char;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::api::context::TvBoxContext;
use crate::api::services::{PluginEntry, PluginFactory};

/// Version of this binary interface. Bumped on any layout change.
pub const RUNTIME_ABI_VERSION: u32 = 1;

/// `tvbox-plugin` version the declaration was compiled against.
pub const SDK_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");

/// Symbol name of the declaration function.
pub const DECLARATION_SYMBOL: &[u8] = b"tvbox_plugin_declaration\0";

/// Signature of the exported declaration function.
pub type DeclarationFn = unsafe extern "C" fn() -> PluginDeclaration;

/// Signature of an entry point constructor.
///
/// Returns a null handle when construction fails.
pub type EntryFactoryFn = unsafe extern "C" fn(context: *const TvBoxContext) -> PluginEntryHandle;

/// Owned, type-erased entry point crossing the library boundary.
#[repr(C)]
#[derive(Debug)]
pub struct PluginEntryHandle {
    /// Thin pointer to a heap-allocated `Box<dyn PluginEntry>`.
    entry: *mut c_void,
}

impl PluginEntryHandle {
    /// A handle signalling failure.
    pub const fn null() -> Self {
        Self {
            entry: std::ptr::null_mut(),
        }
    }

    /// Whether the handle signals failure.
    pub fn is_null(&self) -> bool {
        self.entry.is_null()
    }

    /// Wraps an entry point for transfer.
    pub fn from_box(entry: Box<dyn PluginEntry>) -> Self {
        Self {
            entry: Box::into_raw(Box::new(entry)).cast(),
        }
    }

    /// Takes ownership of the entry point.
    ///
    /// # Safety
    /// The handle must be non-null and produced by [`PluginEntryHandle::from_box`]
    /// in a library built against the same `tvbox-plugin` version.
    pub unsafe fn into_box(self) -> Box<dyn PluginEntry> {
        let outer = unsafe { Box::from_raw(self.entry.cast::<Box<dyn PluginEntry>>()) };
        *outer
    }
}

/// One named entry point.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct EntryPointRecord {
    /// Null-terminated entry point name.
    pub name: *const c_char,
    /// Constructor.
    pub factory: EntryFactoryFn,
}

// Records only point at 'static, immutable data.
unsafe impl Sync for EntryPointRecord {}
unsafe impl Send for EntryPointRecord {}

/// Table returned by `tvbox_plugin_declaration`.
#[repr(C)]
#[derive(Debug)]
pub struct PluginDeclaration {
    /// Must equal [`RUNTIME_ABI_VERSION`].
    pub runtime_abi_version: u32,
    /// Null-terminated `tvbox-plugin` version of the library.
    pub sdk_version: *const c_char,
    /// First record of the entry point table.
    pub entries: *const EntryPointRecord,
    /// Number of records.
    pub entry_count: usize,
}

impl PluginDeclaration {
    /// Declares the given entry point table.
    pub fn new(entries: &'static [EntryPointRecord]) -> Self {
        Self {
            runtime_abi_version: RUNTIME_ABI_VERSION,
            sdk_version: SDK_VERSION.as_ptr().cast(),
            entries: entries.as_ptr(),
            entry_count: entries.len(),
        }
    }
}

/// Generic constructor exported for each registered factory.
///
/// Panics and construction errors become a null handle.
///
/// # Safety
/// `context` must be null or point to a live `TvBoxContext`.
pub unsafe extern "C" fn entry_trampoline<F: PluginFactory>(
    context: *const TvBoxContext,
) -> PluginEntryHandle {
    let Some(context) = (unsafe { context.as_ref() }) else {
        return PluginEntryHandle::null();
    };
    let context = context.clone();
    match catch_unwind(AssertUnwindSafe(|| F::create(context))) {
        Ok(Ok(entry)) => PluginEntryHandle::from_box(entry),
        _ => PluginEntryHandle::null(),
    }
}
