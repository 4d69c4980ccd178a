//! Convenience macros for plugin development.

/// Exports a plugin's entry point table.
///
/// Emits the `tvbox_plugin_declaration` symbol the host resolves when the
/// crate is loaded as a dynamic library, and a `register_entry_points`
/// function that adds the same entry points to a host [`EntryPointTable`]
/// when the crate is linked statically.
///
/// # Example
/// ```rust,ignore
/// tvbox_plugin_sdk::export_plugin!(
///     "com.example.Main" => MainFactory,
///     "com.example.Kids" => KidsFactory,
/// );
/// ```
///
/// [`EntryPointTable`]: crate::EntryPointTable
#[macro_export]
macro_rules! export_plugin {
    ($($name:literal => $factory:ty),+ $(,)?) => {
        #[doc(hidden)]
        static __TVBOX_ENTRY_POINTS: &[$crate::abi::EntryPointRecord] = &[
            $(
                $crate::abi::EntryPointRecord {
                    name: concat!($name, "\0").as_ptr().cast(),
                    factory: $crate::abi::entry_trampoline::<$factory>,
                },
            )+
        ];

        /// Entry point table of this library.
        #[unsafe(no_mangle)]
        pub extern "C" fn tvbox_plugin_declaration() -> $crate::abi::PluginDeclaration {
            $crate::abi::PluginDeclaration::new(__TVBOX_ENTRY_POINTS)
        }

        /// Registers this crate's entry points with a host table.
        pub fn register_entry_points(table: &mut $crate::EntryPointTable) {
            $(
                table.register::<$factory>($name);
            )+
        }
    };
}
