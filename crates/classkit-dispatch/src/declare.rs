#![forbid(unsafe_code)]

//! Forward-declared methods: declare the signature now, implement it later,
//! and override it per subclass.
//!
//! A [`Declaration`] sits in a class namespace with an empty implementation.
//! [`Declaration::implement`] fills it once. [`Declaration::implement_for`]
//! targets a subclass: when the subclass has no declaration of its own under
//! that name, a fresh declaration sharing the stub is installed on the
//! subclass and filled there, so the ancestor's implementation is untouched.
//!
//! Resolution follows attribute lookup: the nearest class in the instance's
//! chain that holds the name decides. If its declaration is still empty the
//! call fails with `NotImplemented`, even when an ancestor has a body, so a
//! subclass can re-declare a method to make it abstract again.
//!
//! # Example
//!
//! ```
//! use classkit_core::{Class, Implementation};
//! use classkit_core::testing::Probe;
//! use classkit_dispatch::{Declaration, declare};
//!
//! let shape = Class::new("Shape");
//! let area: Declaration<Probe, (), i64> = shape.define("area", declare("area")).unwrap();
//! area.implement(Implementation::method(|p: &Probe, ()| p.value * p.value)).unwrap();
//!
//! let square = shape.subclass("Square");
//! area.implement_for(&square, Implementation::function(|()| -1)).unwrap();
//!
//! assert_eq!(area.call(&Probe::new(&shape, 3), ()).unwrap(), 9);
//! assert_eq!(area.call(&Probe::new(&square, 3), ()).unwrap(), -1);
//! ```

use std::any::Any;
use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::rc::Rc;

use classkit_core::{
    BoundMethod, Class, ClassError, ClassInstance, Implementation, Member, Result,
};

/// The declared shape of a forward-declared method, kept for documentation
/// and error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stub {
    name: String,
    doc: Option<String>,
}

impl Stub {
    /// A stub named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: None,
        }
    }

    /// Attach documentation.
    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// The declared name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The attached documentation, if any.
    #[must_use]
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }
}

impl From<&str> for Stub {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Stub {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// A class-scoped method placeholder whose implementation is supplied later.
pub struct Declaration<T: ?Sized, A, R> {
    inner: Rc<DeclarationInner<T, A, R>>,
}

struct DeclarationInner<T: ?Sized, A, R> {
    name: OnceCell<Rc<str>>,
    stub: Rc<Stub>,
    implementation: RefCell<Option<Implementation<T, A, R>>>,
}

impl<T: ?Sized, A, R> Clone for Declaration<T, A, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T, A, R> Declaration<T, A, R>
where
    T: ClassInstance + ?Sized + 'static,
    A: 'static,
    R: 'static,
{
    /// An unimplemented declaration of `stub`.
    pub fn new(stub: impl Into<Stub>) -> Self {
        Self::from_parts(Rc::new(stub.into()), None, None)
    }

    fn from_parts(
        stub: Rc<Stub>,
        name: Option<Rc<str>>,
        implementation: Option<Implementation<T, A, R>>,
    ) -> Self {
        Self {
            inner: Rc::new(DeclarationInner {
                name: name.map_or_else(OnceCell::new, OnceCell::from),
                stub,
                implementation: RefCell::new(implementation),
            }),
        }
    }

    /// The nearest declaration named `name` visible from `class`.
    #[must_use]
    pub fn lookup(class: &Class, name: &str) -> Option<Self> {
        class.lookup::<Self>(name)
    }

    /// The bound name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.inner.name.get().map(|name| &**name)
    }

    /// The declared stub.
    #[must_use]
    pub fn stub(&self) -> &Stub {
        &self.inner.stub
    }

    /// Whether this declaration (not its ancestors) has an implementation.
    #[must_use]
    pub fn is_implemented(&self) -> bool {
        self.inner.implementation.borrow().is_some()
    }

    /// Whether both handles refer to the same declaration.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Fill this declaration's implementation.
    pub fn implement(&self, implementation: Implementation<T, A, R>) -> Result<()> {
        self.fill(implementation, None)
    }

    /// Fill this declaration with a method body.
    pub fn implement_method(&self, method: impl Fn(&T, A) -> R + 'static) -> Result<()> {
        self.implement(Implementation::method(method))
    }

    /// Implement for `owner`.
    ///
    /// If `owner` has no declaration of its own under this name, a new
    /// declaration with the same stub is installed on `owner` and filled, and
    /// ancestors keep their implementations. Otherwise `owner`'s own
    /// declaration is filled, failing if it already is.
    pub fn implement_for(&self, owner: &Class, implementation: Implementation<T, A, R>) -> Result<()> {
        let name = self
            .inner
            .name
            .get()
            .ok_or(ClassError::UnboundMember {
                what: "declaration implemented for an owner",
            })?;

        if owner.defines(name) {
            let own = owner.get_own::<Self>(name).ok_or_else(|| {
                ClassError::AlreadyImplemented {
                    name: name.to_string(),
                    class: Some(owner.name().to_string()),
                }
            })?;
            return own.fill(implementation, Some(owner));
        }

        let overriding = Self::from_parts(
            Rc::clone(&self.inner.stub),
            Some(Rc::clone(name)),
            Some(implementation),
        );
        owner.set_member(name, overriding);
        tracing::debug!(method = %name, class = %owner, "installed subclass override");
        Ok(())
    }

    /// Implement from a type-erased target, optionally for `owner`.
    ///
    /// The target must hold an [`Implementation`] of this declaration's exact
    /// shape.
    pub fn implement_erased(&self, owner: Option<&Class>, target: Rc<dyn Any>) -> Result<()> {
        let Some(implementation) = target.downcast_ref::<Implementation<T, A, R>>() else {
            return Err(ClassError::InvalidImplementationTarget {
                found: "a value that is neither a method nor a function of the declared shape"
                    .into(),
            });
        };
        match owner {
            Some(owner) => self.implement_for(owner, implementation.clone()),
            None => self.implement(implementation.clone()),
        }
    }

    /// Resolve the implementation for `obj` and bind it.
    pub fn bind<'a>(&self, obj: &'a T) -> Result<BoundMethod<'a, T, A, R>> {
        match self.resolve(obj.class()) {
            Some(implementation) => Ok(implementation.bind(obj)),
            None => Err(ClassError::NotImplemented {
                method: self.display_name().to_string(),
                class: obj.class().name().to_string(),
            }),
        }
    }

    /// Resolve, bind and invoke for `obj`.
    pub fn call(&self, obj: &T, args: A) -> Result<R> {
        Ok(self.bind(obj)?.call(args))
    }

    /// Declared methods cannot be assigned through an instance.
    pub fn set<V>(&self, _obj: &T, _value: V) -> Result<()> {
        Err(ClassError::AssignmentRejected { member: "a method" })
    }

    fn resolve(&self, class: &Class) -> Option<Implementation<T, A, R>> {
        let Some(name) = self.name() else {
            return self.inner.implementation.borrow().clone();
        };
        if let Some(owner) = class.ancestors().find(|candidate| candidate.defines(name)) {
            // The nearest member wins, implemented or not; anything other
            // than a declaration shadows it entirely.
            let declaration = owner.get_own::<Self>(name)?;
            return declaration.inner.implementation.borrow().clone();
        }
        // Declarations used outside any class namespace resolve to themselves.
        self.inner.implementation.borrow().clone()
    }

    fn fill(&self, implementation: Implementation<T, A, R>, owner: Option<&Class>) -> Result<()> {
        let mut slot = self.inner.implementation.borrow_mut();
        if slot.is_some() {
            return Err(match owner {
                None => ClassError::AlreadyImplemented {
                    name: self.inner.stub.name().to_string(),
                    class: None,
                },
                Some(owner) => ClassError::AlreadyImplemented {
                    name: self.display_name().to_string(),
                    class: Some(owner.name().to_string()),
                },
            });
        }
        *slot = Some(implementation);
        tracing::debug!(method = self.display_name(), "implemented declaration");
        Ok(())
    }

    fn display_name(&self) -> &str {
        self.name().unwrap_or_else(|| self.inner.stub.name())
    }
}

impl<T, A, R> Member for Declaration<T, A, R>
where
    T: ClassInstance + ?Sized + 'static,
    A: 'static,
    R: 'static,
{
    fn set_name(&self, _owner: &Class, name: &str) -> Result<()> {
        let bound = self.inner.name.get_or_init(|| Rc::from(name));
        if &**bound == name {
            return Ok(());
        }
        Err(ClassError::NameConflict {
            existing: bound.to_string(),
            requested: name.to_string(),
        })
    }
}

impl<T: ?Sized, A, R> fmt::Debug for Declaration<T, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Declaration")
            .field("name", &self.inner.name.get())
            .field("stub", &self.inner.stub.name())
            .field("implemented", &self.inner.implementation.borrow().is_some())
            .finish()
    }
}

/// Declare a method by its stub.
pub fn declare<T, A, R>(stub: impl Into<Stub>) -> Declaration<T, A, R>
where
    T: ClassInstance + ?Sized + 'static,
    A: 'static,
    R: 'static,
{
    Declaration::new(stub)
}

/// Implement the declaration named `name` as seen from `class`, scoped to
/// `class`. This is the class-level "implement" entry point: it fills
/// `class`'s own declaration, or installs an override when the declaration
/// is inherited.
pub fn implement_in<T, A, R>(
    class: &Class,
    name: &str,
    implementation: Implementation<T, A, R>,
) -> Result<()>
where
    T: ClassInstance + ?Sized + 'static,
    A: 'static,
    R: 'static,
{
    let declaration = Declaration::<T, A, R>::lookup(class, name).ok_or(ClassError::UnboundMember {
        what: "declaration",
    })?;
    declaration.implement_for(class, implementation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use classkit_core::testing::Probe;

    type Normal = Declaration<Probe, (i64, i64), (i64, i64)>;

    fn example() -> (Class, Normal) {
        let class = Class::new("Example");
        let normal: Normal = class
            .define("face_normal", declare(Stub::new("face_normal").with_doc("outward normal")))
            .unwrap();
        (class, normal)
    }

    #[test]
    fn unimplemented_call_fails() {
        let (class, normal) = example();
        let err = normal.call(&Probe::new(&class, 0), (1, 2)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "can not find the implementation of the method 'face_normal' in 'Example'"
        );
    }

    #[test]
    fn implement_then_call() {
        let (class, normal) = example();
        normal.implement_method(|_, (x, y)| (x, y)).unwrap();
        assert_eq!(normal.call(&Probe::new(&class, 0), (1, 2)).unwrap(), (1, 2));
        assert!(normal.is_implemented());
        assert_eq!(normal.stub().doc(), Some("outward normal"));
    }

    #[test]
    fn second_implementation_rejected() {
        let (_, normal) = example();
        normal.implement_method(|_, args| args).unwrap();
        let err = normal.implement_method(|_, args| args).unwrap_err();
        assert_eq!(
            err,
            ClassError::AlreadyImplemented {
                name: "face_normal".into(),
                class: None,
            }
        );
    }

    #[test]
    fn override_leaves_parent_alone() {
        let (base, normal) = example();
        normal.implement_method(|_, (x, y)| (x, y)).unwrap();
        let derived = base.subclass("Example2");
        normal
            .implement_for(&derived, Implementation::method(|_, (x, y)| (y, x)))
            .unwrap();

        assert!(derived.defines("face_normal"));
        assert_eq!(normal.call(&Probe::new(&base, 0), (1, 2)).unwrap(), (1, 2));
        assert_eq!(normal.call(&Probe::new(&derived, 0), (1, 2)).unwrap(), (2, 1));

        let installed = Normal::lookup(&derived, "face_normal").unwrap();
        assert!(!installed.ptr_eq(&normal));
        assert_eq!(installed.name(), Some("face_normal"));
        assert_eq!(installed.stub(), normal.stub());
    }

    #[test]
    fn subclass_without_override_inherits() {
        let (base, normal) = example();
        normal.implement_method(|p, (x, y)| (x + p.value, y)).unwrap();
        let derived = base.subclass("Derived");
        let grandchild = derived.subclass("Grandchild");
        assert_eq!(
            normal.call(&Probe::new(&grandchild, 10), (1, 2)).unwrap(),
            (11, 2)
        );
    }

    #[test]
    fn implement_for_owner_that_already_overrides() {
        let (base, normal) = example();
        let derived = base.subclass("Example2");
        normal
            .implement_for(&derived, Implementation::function(|args| args))
            .unwrap();
        let err = normal
            .implement_for(&derived, Implementation::function(|args| args))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "method 'face_normal' of class 'Example2' has already been implemented"
        );
    }

    #[test]
    fn implement_for_defining_class_fills_own() {
        let (base, normal) = example();
        normal
            .implement_for(&base, Implementation::function(|(x, y)| (x * 2, y * 2)))
            .unwrap();
        assert!(normal.is_implemented());
        assert_eq!(normal.call(&Probe::new(&base, 0), (1, 2)).unwrap(), (2, 4));
    }

    #[test]
    fn parent_implemented_after_override_is_still_independent() {
        let (base, normal) = example();
        let derived = base.subclass("Derived");
        normal
            .implement_for(&derived, Implementation::function(|_| (0, 0)))
            .unwrap();
        assert!(normal.call(&Probe::new(&base, 0), (1, 1)).is_err());
        normal.implement_method(|_, args| args).unwrap();
        assert_eq!(normal.call(&Probe::new(&base, 0), (1, 1)).unwrap(), (1, 1));
        assert_eq!(normal.call(&Probe::new(&derived, 0), (1, 1)).unwrap(), (0, 0));
    }

    #[test]
    fn unnamed_declaration_cannot_target_owner() {
        let normal: Normal = declare("loose");
        let class = Class::new("Any");
        let err = normal
            .implement_for(&class, Implementation::function(|args| args))
            .unwrap_err();
        assert!(matches!(err, ClassError::UnboundMember { .. }));

        normal.implement(Implementation::function(|args| args)).unwrap();
        assert_eq!(normal.call(&Probe::new(&class, 0), (5, 6)).unwrap(), (5, 6));
    }

    #[test]
    fn erased_targets_are_checked() {
        let (class, normal) = example();
        let bogus: Rc<dyn Any> = Rc::new(42_u32);
        assert!(matches!(
            normal.implement_erased(None, bogus),
            Err(ClassError::InvalidImplementationTarget { .. })
        ));

        let good: Rc<dyn Any> = Rc::new(Implementation::<Probe, (i64, i64), (i64, i64)>::function(
            |(x, y)| (x - y, 0),
        ));
        normal.implement_erased(None, good).unwrap();
        assert_eq!(normal.call(&Probe::new(&class, 0), (5, 3)).unwrap(), (2, 0));
    }

    #[test]
    fn rebinding_under_other_name_conflicts() {
        let (_, normal) = example();
        let other = Class::new("Other");
        assert!(matches!(
            other.define("_face_normal", normal.clone()),
            Err(ClassError::NameConflict { .. })
        ));
        other.define("face_normal", normal).unwrap();
    }

    #[test]
    fn assignment_rejected() {
        let (class, normal) = example();
        assert_eq!(
            normal.set(&Probe::new(&class, 0), ()),
            Err(ClassError::AssignmentRejected { member: "a method" })
        );
    }

    #[test]
    fn implement_in_uses_class_view() {
        let (base, normal) = example();
        let derived = base.subclass("Derived");
        implement_in::<Probe, (i64, i64), (i64, i64)>(
            &base,
            "face_normal",
            Implementation::function(|args| args),
        )
        .unwrap();
        implement_in::<Probe, (i64, i64), (i64, i64)>(
            &derived,
            "face_normal",
            Implementation::function(|(x, y): (i64, i64)| (-x, -y)),
        )
        .unwrap();
        assert!(normal.is_implemented());
        assert_eq!(normal.call(&Probe::new(&derived, 0), (1, 2)).unwrap(), (-1, -2));
        assert!(matches!(
            implement_in::<Probe, (), ()>(&base, "missing", Implementation::function(|()| ())),
            Err(ClassError::UnboundMember { .. })
        ));
    }

    #[tracing_test::traced_test]
    #[test]
    fn subclass_override_is_logged() {
        let (base, normal) = example();
        let derived = base.subclass("Example2");
        normal
            .implement_for(&derived, Implementation::function(|args| args))
            .unwrap();
        assert!(logs_contain("installed subclass override"));
    }

    #[test]
    fn redeclared_subclass_method_is_abstract_again() {
        let (base, normal) = example();
        normal.implement_method(|_, args| args).unwrap();
        let derived = base.subclass("Derived");
        let redeclared: Normal = derived
            .define("face_normal", declare("face_normal"))
            .unwrap();

        let err = redeclared.call(&Probe::new(&derived, 0), (1, 2)).unwrap_err();
        assert_eq!(
            err,
            ClassError::NotImplemented {
                method: "face_normal".into(),
                class: "Derived".into(),
            }
        );
        assert!(normal.call(&Probe::new(&derived, 0), (1, 2)).is_err());
        assert_eq!(normal.call(&Probe::new(&base, 0), (1, 2)).unwrap(), (1, 2));

        redeclared.implement_method(|_, (x, y)| (x + 1, y + 1)).unwrap();
        assert_eq!(normal.call(&Probe::new(&derived, 0), (1, 2)).unwrap(), (2, 3));
    }

    #[test]
    fn non_declaration_member_shadows_inherited_body() {
        let (base, normal) = example();
        normal.implement_method(|_, args| args).unwrap();
        let derived = base.subclass("Derived");
        derived.set_member("face_normal", 7_u8);
        assert!(matches!(
            normal.call(&Probe::new(&derived, 0), (1, 2)),
            Err(ClassError::NotImplemented { .. })
        ));
    }
}
