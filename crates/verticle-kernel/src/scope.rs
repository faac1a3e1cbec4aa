//! Dynamically scoped bindings.
//!
//! A [`ScopeStack`] is a per-thread stack of frames. [`ScopeStack::enter`]
//! pushes a frame, runs a closure and pops the frame again, also when the
//! closure unwinds. Code running inside the closure on the same thread sees
//! the innermost frame through [`ScopeStack::with_current`]; other threads
//! never do. This is what lets many verticles share one interpreter while
//! each start keeps its own state.
//!
//! ```rust,ignore
//! thread_local! {
//!     static FRAMES: RefCell<Vec<Vec<u32>>> = const { RefCell::new(Vec::new()) };
//! }
//!
//! let stack = ScopeStack::new(&FRAMES);
//! let ((), frame) = stack.enter(Vec::new(), || {
//!     stack.with_current(|f| f.push(1));
//! });
//! assert_eq!(frame, vec![1]);
//! ```

use std::cell::RefCell;
use std::thread::LocalKey;

/// Handle on a thread-local stack of frames of type `F`.
pub struct ScopeStack<F: 'static> {
    frames: &'static LocalKey<RefCell<Vec<F>>>,
}

impl<F: 'static> Clone for ScopeStack<F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F: 'static> Copy for ScopeStack<F> {}

impl<F: 'static> ScopeStack<F> {
    /// `frames` must be reached only through `ScopeStack`; popping it
    /// directly breaks [`enter`](Self::enter).
    pub const fn new(frames: &'static LocalKey<RefCell<Vec<F>>>) -> Self {
        Self { frames }
    }

    /// Run `body` with `frame` as the innermost frame on this thread.
    /// Returns the body's result and the frame as the body left it.
    pub fn enter<R>(&self, frame: F, body: impl FnOnce() -> R) -> (R, F) {
        self.frames.with(|frames| frames.borrow_mut().push(frame));
        let mut guard = PopOnUnwind {
            frames: self.frames,
            armed: true,
        };

        let result = body();

        guard.armed = false;
        // Unreachable `None`: frames are only pushed and popped here, nested
        // `enter` calls pop exactly their own frame (also on unwind), and
        // `with_current` lends out a frame, never the stack.
        let frame = self
            .frames
            .with(|frames| frames.borrow_mut().pop())
            .expect("scope frame popped outside ScopeStack::enter");
        (result, frame)
    }

    /// Apply `f` to the innermost frame of the calling thread.
    /// `None` when no frame is active.
    ///
    /// `f` must not re-enter this stack.
    pub fn with_current<R>(&self, f: impl FnOnce(&mut F) -> R) -> Option<R> {
        self.frames
            .with(|frames| frames.borrow_mut().last_mut().map(f))
    }

    pub fn is_active(&self) -> bool {
        self.depth() > 0
    }

    pub fn depth(&self) -> usize {
        self.frames.with(|frames| frames.borrow().len())
    }
}

struct PopOnUnwind<F: 'static> {
    frames: &'static LocalKey<RefCell<Vec<F>>>,
    armed: bool,
}

impl<F: 'static> Drop for PopOnUnwind<F> {
    fn drop(&mut self) {
        if self.armed {
            // try_with: the thread-local may already be gone during thread teardown
            let _ = self.frames.try_with(|frames| {
                if let Ok(mut frames) = frames.try_borrow_mut() {
                    frames.pop();
                }
            });
        }
    }
}
