/*!
 * Scope Guard
 * RAII link between a lexical scope and the thread's tree cursor
 */

use crate::core::types::ScopeName;
use crate::hooks;
use crate::tree::ScopeTree;
use std::marker::PhantomData;

/// Pushes a scope on construction and pops it on drop, but only when the
/// push actually moved the cursor. A push refused by a depth, node or
/// fanout limit leaves the cursor where it was, and the guard remembers
/// that, so nesting stays balanced even at the limits.
///
/// Construction and destruction perform no heap allocation. Before the
/// engine is initialized a guard is inert.
///
/// # Example
///
/// ```no_run
/// let _scope = mtag::ScopeGuard::new("decode");
/// // allocations here are attributed to ...decode
/// ```
pub struct ScopeGuard {
    tree: Option<&'static ScopeTree>,
    pushed: bool,
    // the cursor belongs to the constructing thread
    _not_send: PhantomData<*const ()>,
}

impl ScopeGuard {
    pub fn new(name: &str) -> Self {
        Self::enter(ScopeName::new(name))
    }

    /// Scope named `Class::function`
    pub fn with_class(class_name: &str, function_name: &str) -> Self {
        Self::enter(ScopeName::joined(class_name, function_name))
    }

    fn enter(name: ScopeName) -> Self {
        match hooks::current_tree_or_register() {
            Some(tree) => {
                let pushed = tree.push(&name);
                Self {
                    tree: Some(tree),
                    pushed,
                    _not_send: PhantomData,
                }
            }
            None => Self {
                tree: None,
                pushed: false,
                _not_send: PhantomData,
            },
        }
    }

    /// Whether construction actually advanced the cursor
    pub fn pushed(&self) -> bool {
        self.pushed
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if self.pushed {
            if let Some(tree) = self.tree {
                tree.pop();
            }
        }
    }
}
