//! Byte callbacks invoked while a body is streamed.
//!
//! Uploads and downloads feed every chunk through a list of callbacks, which
//! is how checksums are computed on the fly and progress is reported.

use std::sync::Arc;

use parking_lot::Mutex;

/// A boxed closure receiving each streamed chunk.
pub type CallbackFunInner = Box<dyn FnMut(&[u8]) + Send>;

/// A cloneable, thread-safe handle to a chunk callback.
///
/// Clones share the same closure, so state captured by it (a hasher, a
/// byte counter) sees every chunk regardless of which clone was called.
pub struct CallbackFun {
    inner: Arc<Mutex<CallbackFunInner>>,
}

impl Clone for CallbackFun {
    fn clone(&self) -> Self {
        CallbackFun {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for CallbackFun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackFun").finish_non_exhaustive()
    }
}

impl CallbackFun {
    pub fn new(f: CallbackFunInner) -> Self {
        CallbackFun {
            inner: Arc::new(Mutex::new(f)),
        }
    }

    /// Passes a chunk to the wrapped closure.
    pub fn call(&self, chunk: &[u8]) {
        let mut f = self.inner.lock();
        f(chunk);
    }

    /// Wraps a closure into a `CallbackFun`.
    pub fn wrap<F>(closure: F) -> Self
    where
        F: FnMut(&[u8]) + Send + 'static,
    {
        CallbackFun::new(Box::new(closure))
    }

    /// Calls every callback of an optional list with the same chunk.
    pub(crate) fn call_all(callbacks: &Option<Vec<CallbackFun>>, chunk: &[u8]) {
        if let Some(callbacks) = callbacks {
            for callback in callbacks {
                callback.call(chunk);
            }
        }
    }
}
