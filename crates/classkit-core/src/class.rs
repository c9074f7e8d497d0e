#![forbid(unsafe_code)]

//! Runtime class objects with single inheritance and an own namespace.
//!
//! A [`Class`] plays the role a class body plays for descriptors: members are
//! placed into its namespace with [`Class::define`], which runs the member's
//! name-binding hook first, and resolved with [`Class::lookup`], which walks
//! the ancestor chain the way attribute lookup does.
//!
//! # Invariants
//!
//! 1. Lookup visits the class itself, then its parent, then the parent's
//!    parent, stopping at the first class whose own namespace holds the name.
//! 2. A name held by a nearer class shadows every ancestor, even when the
//!    nearer member has a different type (lookup then yields `None`).
//! 3. `Class` is a cheap handle; clones share the same namespace and compare
//!    equal by identity.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::error::Result;

/// A named class with an optional parent and an own member namespace.
#[derive(Clone)]
pub struct Class {
    inner: Rc<ClassInner>,
}

struct ClassInner {
    name: String,
    parent: Option<Class>,
    namespace: RefCell<AHashMap<Rc<str>, Rc<dyn Any>>>,
}

impl Class {
    /// Create a root class.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_parent(name.into(), None)
    }

    /// Create a class deriving from `self`.
    #[must_use]
    pub fn subclass(&self, name: impl Into<String>) -> Self {
        Self::with_parent(name.into(), Some(self.clone()))
    }

    fn with_parent(name: String, parent: Option<Class>) -> Self {
        Self {
            inner: Rc::new(ClassInner {
                name,
                parent,
                namespace: RefCell::new(AHashMap::new()),
            }),
        }
    }

    /// The class name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The direct parent, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Class> {
        self.inner.parent.as_ref()
    }

    /// Iterate over `self` and its ancestors, nearest first.
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors { next: Some(self) }
    }

    /// Whether `self` is `other` or derives from it.
    #[must_use]
    pub fn is_subclass_of(&self, other: &Class) -> bool {
        self.ancestors().any(|class| class == other)
    }

    /// Bind `member` to `name` and place it in this class's own namespace.
    ///
    /// This is the class-body assignment: the member's [`Member::set_name`]
    /// hook runs first, and a rejected binding leaves the namespace untouched.
    pub fn define<M>(&self, name: &str, member: M) -> Result<M>
    where
        M: Member + Clone + 'static,
    {
        member.set_name(self, name)?;
        self.set_member(name, member.clone());
        tracing::trace!(class = %self.name(), member = name, "defined class member");
        Ok(member)
    }

    /// Place `member` under `name` without running any binding hook,
    /// replacing whatever the own namespace held.
    pub fn set_member<M: 'static>(&self, name: &str, member: M) {
        self.inner
            .namespace
            .borrow_mut()
            .insert(Rc::from(name), Rc::new(member));
    }

    /// Whether this class's own namespace holds `name` (ancestors ignored).
    #[must_use]
    pub fn defines(&self, name: &str) -> bool {
        self.inner.namespace.borrow().contains_key(name)
    }

    /// The member stored directly on this class under `name`, if it has type `M`.
    #[must_use]
    pub fn get_own<M: Clone + 'static>(&self, name: &str) -> Option<M> {
        let member = self.inner.namespace.borrow().get(name).cloned()?;
        member.downcast_ref::<M>().cloned()
    }

    /// Resolve `name` through the ancestor chain.
    #[must_use]
    pub fn lookup<M: Clone + 'static>(&self, name: &str) -> Option<M> {
        self.lookup_with_owner(name).map(|(_, member)| member)
    }

    /// Resolve `name` through the ancestor chain, also returning the class
    /// whose namespace held it.
    #[must_use]
    pub fn lookup_with_owner<M: Clone + 'static>(&self, name: &str) -> Option<(Class, M)> {
        let owner = self.ancestors().find(|class| class.defines(name))?;
        let member = owner.get_own::<M>(name)?;
        Some((owner.clone(), member))
    }

    /// Names in the own namespace, sorted.
    #[must_use]
    pub fn member_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .namespace
            .borrow()
            .keys()
            .map(|name| name.to_string())
            .collect();
        names.sort_unstable();
        names
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Class {}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name())
            .field("parent", &self.parent().map(Class::name))
            .field("members", &self.member_names())
            .finish()
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Iterator over a class and its ancestors.
#[derive(Debug)]
pub struct Ancestors<'a> {
    next: Option<&'a Class>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Class;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent();
        Some(current)
    }
}

/// A value that can live in a class namespace and learns its name there.
pub trait Member {
    /// Called once per [`Class::define`]. Implementations decide whether a
    /// second, different name is acceptable.
    fn set_name(&self, owner: &Class, name: &str) -> Result<()>;
}

/// Instances that know their class.
pub trait ClassInstance {
    /// The instance's runtime class.
    fn class(&self) -> &Class;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClassError;
    use std::cell::Cell;

    #[derive(Clone, Debug, Default)]
    struct Tag {
        binds: Rc<Cell<u32>>,
    }

    impl Member for Tag {
        fn set_name(&self, _owner: &Class, name: &str) -> Result<()> {
            if name == "forbidden" {
                return Err(ClassError::NameConflict {
                    existing: "tag".into(),
                    requested: name.into(),
                });
            }
            self.binds.set(self.binds.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn lookup_walks_ancestors() {
        let base = Class::new("Base");
        let mid = base.subclass("Mid");
        let leaf = mid.subclass("Leaf");
        base.set_member("answer", 42_u32);

        assert_eq!(leaf.lookup::<u32>("answer"), Some(42));
        let (owner, _) = leaf.lookup_with_owner::<u32>("answer").unwrap();
        assert_eq!(owner, base);
        assert!(!leaf.defines("answer"));
    }

    #[test]
    fn nearer_member_shadows_even_with_other_type() {
        let base = Class::new("Base");
        let derived = base.subclass("Derived");
        base.set_member("value", 1_u32);
        derived.set_member("value", "text");

        assert_eq!(derived.lookup::<u32>("value"), None);
        assert_eq!(derived.lookup::<&str>("value"), Some("text"));
        assert_eq!(base.lookup::<u32>("value"), Some(1));
    }

    #[test]
    fn define_runs_binding_hook() {
        let class = Class::new("Widget");
        let tag = Tag::default();
        class.define("label", tag.clone()).unwrap();
        assert_eq!(tag.binds.get(), 1);
        assert!(class.defines("label"));

        let err = class.define("forbidden", tag.clone()).unwrap_err();
        assert!(matches!(err, ClassError::NameConflict { .. }));
        assert!(!class.defines("forbidden"));
    }

    #[test]
    fn ancestry_queries() {
        let base = Class::new("Base");
        let derived = base.subclass("Derived");
        let other = Class::new("Other");

        assert!(derived.is_subclass_of(&base));
        assert!(derived.is_subclass_of(&derived));
        assert!(!base.is_subclass_of(&derived));
        assert!(!derived.is_subclass_of(&other));

        let names: Vec<&str> = derived.ancestors().map(Class::name).collect();
        assert_eq!(names, ["Derived", "Base"]);
    }

    #[test]
    fn debug_shows_parent_and_members() {
        let base = Class::new("Base");
        let derived = base.subclass("Derived");
        derived.set_member("x", ());
        let debug = format!("{derived:?}");
        assert!(debug.contains("Some(\"Base\")"));
        assert!(debug.contains("[\"x\"]"));
    }
}
