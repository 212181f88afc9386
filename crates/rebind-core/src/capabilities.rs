/// Features of the combinator layer a binder may rely on when it
/// materializes. Injected per binder; never read from global state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Use the two-path `try_finally` combinator. When false, try/finally
    /// is emulated with `fold_arguments` plus `catch_exception`.
    pub native_try_finally: bool,
}

impl Capabilities {
    pub fn native() -> Self {
        Capabilities {
            native_try_finally: true,
        }
    }

    pub fn emulated() -> Self {
        Capabilities {
            native_try_finally: false,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities::native()
    }
}
