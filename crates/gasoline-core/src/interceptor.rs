use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InterceptorError {
    #[error("interceptor is already installed")]
    AlreadyInstalled,
    #[error("interceptor is not installed")]
    NotInstalled,
}

/// Generic `{uninstalled, installed}` state machine (spec.md §4.14).
/// `Original` is whatever the host-side wrapper needs to restore on
/// uninstall (a function reference, a constructor, a listener handle);
/// this crate never inspects it. `install` captures it exactly once and
/// `uninstall` hands back the same value, so a double-install is refused
/// rather than silently wrapping a wrapper — this is what keeps
/// performance-capture install from recursing.
#[derive(Debug)]
pub struct Interceptor<Original> {
    original: Option<Original>,
}

impl<Original> Default for Interceptor<Original> {
    fn default() -> Self {
        Interceptor { original: None }
    }
}

impl<Original> Interceptor<Original> {
    pub fn new() -> Self {
        Interceptor::default()
    }

    pub fn is_installed(&self) -> bool {
        self.original.is_some()
    }

    /// Stores `original` and transitions to `installed`. Refuses a
    /// second install without touching the stored value.
    pub fn install(&mut self, original: Original) -> Result<(), InterceptorError> {
        if self.original.is_some() {
            return Err(InterceptorError::AlreadyInstalled);
        }
        self.original = Some(original);
        Ok(())
    }

    /// Hands back the original captured at install time and transitions
    /// to `uninstalled`.
    pub fn uninstall(&mut self) -> Result<Original, InterceptorError> {
        self.original.take().ok_or(InterceptorError::NotInstalled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_then_uninstall_restores_original() {
        let mut i: Interceptor<&'static str> = Interceptor::new();
        assert!(!i.is_installed());
        i.install("original-console-log").unwrap();
        assert!(i.is_installed());
        assert_eq!(i.uninstall().unwrap(), "original-console-log");
        assert!(!i.is_installed());
    }

    #[test]
    fn double_install_is_refused() {
        let mut i: Interceptor<u32> = Interceptor::new();
        i.install(1).unwrap();
        assert_eq!(i.install(2), Err(InterceptorError::AlreadyInstalled));
    }

    #[test]
    fn uninstall_without_install_is_refused() {
        let mut i: Interceptor<u32> = Interceptor::new();
        assert_eq!(i.uninstall(), Err(InterceptorError::NotInstalled));
    }
}
