//! Token registry correlating libFLAC's `client_data` with codec instances.
//!
//! libFLAC hands back an opaque pointer on every callback. Instead of the
//! instance's address we register its shared context here and pass a numeric
//! token; the dispatch shim looks the token up on each callback. A token that
//! has already been unregistered resolves to nothing, so a late callback can
//! never reach freed memory.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Opaque correlation token carried through libFLAC as `client_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Token(u64);

impl Token {
    pub(crate) fn as_client_data(self) -> *mut c_void {
        self.0 as usize as *mut c_void
    }

    pub(crate) fn from_client_data(client_data: *mut c_void) -> Self {
        Token(client_data as usize as u64)
    }
}

/// Token → context map for one kind of codec instance.
pub(crate) struct Registry<T> {
    next: AtomicU64,
    slots: Mutex<HashMap<Token, Arc<Mutex<T>>>>,
}

impl<T> Registry<T> {
    pub(crate) fn new() -> Self {
        Self {
            // Token 0 is never issued so a null client_data never resolves
            next: AtomicU64::new(1),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Register a context and hand back the guard that owns its token.
    pub(crate) fn register(&'static self, context: T) -> Registration<T> {
        let token = Token(self.next.fetch_add(1, Ordering::Relaxed));
        let context = Arc::new(Mutex::new(context));
        self.slots.lock().insert(token, Arc::clone(&context));

        Registration {
            registry: self,
            token,
            context,
        }
    }

    pub(crate) fn lookup(&self, token: Token) -> Option<Arc<Mutex<T>>> {
        self.slots.lock().get(&token).cloned()
    }

    fn unregister(&self, token: Token) {
        self.slots.lock().remove(&token);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.lock().len()
    }
}

/// Owning guard for a registered context; unregisters its token on drop.
pub(crate) struct Registration<T: 'static> {
    registry: &'static Registry<T>,
    token: Token,
    context: Arc<Mutex<T>>,
}

impl<T> Registration<T> {
    pub(crate) fn token(&self) -> Token {
        self.token
    }

    pub(crate) fn context(&self) -> &Mutex<T> {
        &self.context
    }
}

impl<T> Drop for Registration<T> {
    fn drop(&mut self) {
        self.registry.unregister(self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::LazyLock;

    static NUMBERS: LazyLock<Registry<u32>> = LazyLock::new(Registry::new);

    #[test]
    fn test_token_round_trips_through_client_data() {
        let token = Token(42);
        assert_eq!(Token::from_client_data(token.as_client_data()), token);
    }

    #[test]
    fn test_register_lookup_unregister() {
        let registration = NUMBERS.register(7);
        let token = registration.token();

        let context = NUMBERS.lookup(token).expect("registered");
        *context.lock() += 1;
        assert_eq!(*registration.context().lock(), 8);

        drop(context);
        drop(registration);
        assert!(NUMBERS.lookup(token).is_none());
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = NUMBERS.register(1);
        let b = NUMBERS.register(2);
        assert_ne!(a.token(), b.token());
        assert!(NUMBERS.len() >= 2);
    }

    #[test]
    fn test_null_client_data_never_resolves() {
        let _registration = NUMBERS.register(0);
        assert!(NUMBERS
            .lookup(Token::from_client_data(std::ptr::null_mut()))
            .is_none());
    }
}
