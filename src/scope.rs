//! Arena of nested binding frames.
//!
//! Frames live in a `Vec` and point at their parent by index. Frames are
//! pushed and popped in stack order, but a frame's parent does not have to be
//! the frame below it: function calls open a frame whose parent is the global
//! frame while the caller's frames stay alive underneath.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

#[derive(Debug)]
struct Frame<T> {
    bindings: HashMap<String, T>,
    parent: Option<ScopeId>,
}

#[derive(Debug)]
pub struct ScopeTree<T> {
    frames: Vec<Frame<T>>,
    current: ScopeId,
}

impl<T> Default for ScopeTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ScopeTree<T> {
    /// Creates a tree holding only the global frame.
    pub fn new() -> Self {
        Self {
            frames: vec![Frame {
                bindings: HashMap::new(),
                parent: None,
            }],
            current: ScopeId(0),
        }
    }

    pub fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn current(&self) -> ScopeId {
        self.current
    }

    /// Number of live frames, the global frame included.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Opens a frame under `parent` and makes it current. Returns the frame
    /// that was current before, to be handed back to [`ScopeTree::exit`].
    pub fn enter(&mut self, parent: ScopeId) -> ScopeId {
        let previous = self.current;
        self.frames.push(Frame {
            bindings: HashMap::new(),
            parent: Some(parent),
        });
        self.current = ScopeId(self.frames.len() - 1);
        previous
    }

    pub fn enter_child(&mut self) -> ScopeId {
        self.enter(self.current)
    }

    /// Drops the innermost frame and restores `previous` as current.
    pub fn exit(&mut self, previous: ScopeId) {
        debug_assert_eq!(self.current.0, self.frames.len() - 1);
        if self.frames.len() > 1 {
            self.frames.pop();
        }
        self.current = previous;
    }

    pub fn is_declared_locally(&self, name: &str) -> bool {
        self.frames[self.current.0].bindings.contains_key(name)
    }

    /// Binds `name` in the current frame, replacing any previous binding
    /// there. Outer frames are never touched.
    pub fn define(&mut self, name: impl Into<String>, value: T) -> Option<T> {
        self.frames[self.current.0]
            .bindings
            .insert(name.into(), value)
    }

    pub fn resolve(&self, name: &str) -> Option<&T> {
        let frame = self.find_frame(name)?;
        self.frames[frame].bindings.get(name)
    }

    /// Nearest binding of `name`, searching outward from the current frame.
    pub fn resolve_mut(&mut self, name: &str) -> Option<&mut T> {
        let frame = self.find_frame(name)?;
        self.frames[frame].bindings.get_mut(name)
    }

    fn find_frame(&self, name: &str) -> Option<usize> {
        let mut scope = Some(self.current);
        while let Some(ScopeId(index)) = scope {
            let frame = &self.frames[index];
            if frame.bindings.contains_key(name) {
                return Some(index);
            }
            scope = frame.parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_frames_see_outer_bindings() {
        let mut scopes = ScopeTree::new();
        scopes.define("x", 1);
        let previous = scopes.enter_child();
        scopes.define("y", 2);
        assert_eq!(scopes.resolve("x"), Some(&1));
        assert_eq!(scopes.resolve("y"), Some(&2));
        scopes.exit(previous);
        assert_eq!(scopes.resolve("y"), None);
        assert_eq!(scopes.depth(), 1);
    }

    #[test]
    fn shadowing_binds_in_the_current_frame_only() {
        let mut scopes = ScopeTree::new();
        scopes.define("x", 1);
        let previous = scopes.enter_child();
        assert!(!scopes.is_declared_locally("x"));
        scopes.define("x", 2);
        *scopes.resolve_mut("x").expect("bound") = 3;
        scopes.exit(previous);
        assert_eq!(scopes.resolve("x"), Some(&1));
    }

    #[test]
    fn assignment_writes_the_nearest_enclosing_binding() {
        let mut scopes = ScopeTree::new();
        scopes.define("total", 0);
        let previous = scopes.enter_child();
        *scopes.resolve_mut("total").expect("bound") = 10;
        scopes.exit(previous);
        assert_eq!(scopes.resolve("total"), Some(&10));
    }

    #[test]
    fn frames_rooted_at_global_skip_the_callers_frames() {
        let mut scopes = ScopeTree::new();
        scopes.define("global", 1);
        let outer = scopes.enter_child();
        scopes.define("local", 2);
        let caller = scopes.enter(scopes.global());
        assert_eq!(scopes.resolve("global"), Some(&1));
        assert_eq!(scopes.resolve("local"), None);
        scopes.exit(caller);
        assert_eq!(scopes.resolve("local"), Some(&2));
        scopes.exit(outer);
        assert_eq!(scopes.current(), scopes.global());
    }
}
