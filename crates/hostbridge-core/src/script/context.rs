//! Per-thread script execution context.
//!
//! Script code only runs on a thread that has entered a context. Generated
//! overrides look the context up on every call and fail with
//! [`RuntimeError::NoActiveContext`] when there is none; they never create
//! one on the caller's behalf.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::thread::{self, JoinHandle};

use crate::error::{RuntimeError, ScriptResult};

/// Default limit on nested script calls.
pub const DEFAULT_MAX_CALL_DEPTH: u32 = 256;

thread_local! {
    static ACTIVE: RefCell<Option<ScriptContext>> = const { RefCell::new(None) };
}

/// Options applied when a context is first entered on a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextOptions {
    /// Nested script calls allowed before failing with a stack overflow.
    pub max_call_depth: u32,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl ContextOptions {
    pub fn with_max_call_depth(mut self, depth: u32) -> Self {
        self.max_call_depth = depth;
        self
    }
}

struct ContextState {
    options: ContextOptions,
    depth: Cell<u32>,
    nesting: Cell<u32>,
}

/// Handle to the active context of the current thread.
///
/// Contexts are bound to the thread that entered them and cannot be sent
/// elsewhere.
#[derive(Clone)]
pub struct ScriptContext {
    state: Rc<ContextState>,
}

impl ScriptContext {
    /// Enter a context with default options.
    pub fn enter() -> ContextGuard {
        Self::enter_with(ContextOptions::default())
    }

    /// Enter a context on this thread.
    ///
    /// If the thread already has an active context, it is reused and the
    /// options are ignored; the context stays active until the outermost
    /// guard is dropped.
    pub fn enter_with(options: ContextOptions) -> ContextGuard {
        ACTIVE.with(|slot| {
            let mut slot = slot.borrow_mut();
            let cx = match slot.as_ref() {
                Some(existing) => existing.clone(),
                None => {
                    let cx = ScriptContext {
                        state: Rc::new(ContextState {
                            options,
                            depth: Cell::new(0),
                            nesting: Cell::new(0),
                        }),
                    };
                    *slot = Some(cx.clone());
                    cx
                }
            };
            cx.state.nesting.set(cx.state.nesting.get() + 1);
            ContextGuard { cx }
        })
    }

    /// The active context of the calling thread.
    pub fn current() -> ScriptResult<ScriptContext> {
        ACTIVE.with(|slot| slot.borrow().clone().ok_or(RuntimeError::NoActiveContext))
    }

    /// Whether the calling thread has an active context.
    pub fn is_active() -> bool {
        ACTIVE.with(|slot| slot.borrow().is_some())
    }

    pub fn options(&self) -> &ContextOptions {
        &self.state.options
    }

    /// Current depth of nested script calls.
    pub fn call_depth(&self) -> u32 {
        self.state.depth.get()
    }

    /// Record entry into a script call; the frame is popped when dropped.
    pub fn enter_call(&self) -> ScriptResult<CallFrame> {
        let depth = self.state.depth.get();
        if depth >= self.state.options.max_call_depth {
            return Err(RuntimeError::StackOverflow {
                limit: self.state.options.max_call_depth,
            });
        }
        self.state.depth.set(depth + 1);
        Ok(CallFrame {
            state: Rc::clone(&self.state),
        })
    }
}

impl fmt::Debug for ScriptContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptContext")
            .field("options", &self.state.options)
            .field("depth", &self.state.depth.get())
            .field("nesting", &self.state.nesting.get())
            .finish()
    }
}

/// Keeps a context active on the current thread.
pub struct ContextGuard {
    cx: ScriptContext,
}

impl ContextGuard {
    pub fn context(&self) -> &ScriptContext {
        &self.cx
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let nesting = self.cx.state.nesting.get().saturating_sub(1);
        self.cx.state.nesting.set(nesting);
        if nesting == 0 {
            // try_with: the thread-local may already be gone during thread exit
            let _ = ACTIVE.try_with(|slot| slot.borrow_mut().take());
        }
    }
}

impl fmt::Debug for ContextGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ContextGuard").field(&self.cx).finish()
    }
}

/// One level of script call nesting.
pub struct CallFrame {
    state: Rc<ContextState>,
}

impl Drop for CallFrame {
    fn drop(&mut self) {
        self.state.depth.set(self.state.depth.get().saturating_sub(1));
    }
}

/// Run `task` on a new thread that has entered a fresh context.
///
/// The context is exited when the task returns. Task failures are logged
/// and handed back through the join handle.
pub fn spawn_in_context<T, F>(
    options: ContextOptions,
    task: F,
) -> std::io::Result<JoinHandle<ScriptResult<T>>>
where
    T: Send + 'static,
    F: FnOnce(&ScriptContext) -> ScriptResult<T> + Send + 'static,
{
    thread::Builder::new()
        .name("script-worker".to_string())
        .spawn(move || {
            let guard = ScriptContext::enter_with(options);
            tracing::debug!("entered script context on worker thread");
            let result = task(guard.context());
            if let Err(err) = &result {
                tracing::warn!(error = %err, "script worker task failed");
            }
            drop(guard);
            result
        })
}
