//! Helper macros for ABI function generation.

/// Generate an exported `extern "C"` function for entry points that take
/// only plain integer arguments and therefore need no `unsafe` contract.
///
/// ```ignore
/// abi_fn! {
///     /// Doc comment for the function.
///     fn my_func(fd: c_int) -> c_int {
///         // implementation body
///     }
/// }
/// ```
///
/// Entry points that dereference caller pointers are written out by hand as
/// `pub unsafe extern "C" fn`.
macro_rules! abi_fn {
    (
        $(#[$meta:meta])*
        fn $name:ident( $($arg:ident : $argty:ty),* $(,)? ) -> $ret:ty
        $body:block
    ) => {
        $(#[$meta])*
        #[unsafe(no_mangle)]
        pub extern "C" fn $name( $($arg : $argty),* ) -> $ret
        $body
    };
}

pub(crate) use abi_fn;
