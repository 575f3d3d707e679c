#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

use std::{fmt, rc::Rc};

use util::abbreviation::Abbreviation;

//=================================================================================================|

/// A resource name: a dot-separated, non-empty path built as `"<scope>.<module>.<attr>"`
/// (or `"<module>.<attr>"` when scope is empty).
///
/// `Name` is the sole universal key across the [`Registry`](crate::registry::Registry).
/// User code never constructs one directly — only [`Module::resource`](crate::module::ModuleBase::resource)
/// and [`Module::declare_resource`](crate::module::ModuleBase::declare_resource) do, by
/// qualifying an attribute name with a module's prefix.
///
/// Backed by `Rc<str>` so cloning a `Name` (which happens constantly — every
/// `Resource`, every `dep_sig` entry, every diagnostic line) is a pointer bump, not an
/// allocation.
#[derive(Clone, Eq, PartialOrd, Ord, Hash)]
pub struct Name(Rc<str>);

impl Name {
    /// Builds a name by qualifying `attr` with a module prefix.
    ///
    /// `prefix` is expected to already be `"<scope>.<module>"` or `"<module>"`; this is
    /// what [`ModuleBase`](crate::module::ModuleBase) constructs at module-creation time.
    pub(crate) fn qualify(prefix: &str, attr: &str) -> Name {
        debug_assert!(!attr.is_empty(), "resource attribute name must not be empty");
        if prefix.is_empty() {
            Name(Rc::from(attr))
        } else {
            Name(Rc::from(format!("{prefix}.{attr}").as_str()))
        }
    }

    /// Builds the prefix for a module: `"<scope>.<module>"`, or `"<module>"` if `scope`
    /// is empty.
    pub(crate) fn module_prefix(scope: &str, module_name: &str) -> String {
        if scope.is_empty() {
            module_name.to_string()
        } else {
            format!("{scope}.{module_name}")
        }
    }

    /// Returns the name as a plain string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        // Pointer equality is a valid fast path since `Name`s for the same string are
        // usually, but not always, produced from the same `Rc` allocation; fall back to
        // string comparison rather than requiring interning discipline from callers.
        Rc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", self.0)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Abbreviation for Name {
    fn abbreviation(&self) -> std::borrow::Cow<'static, str> {
        self.0.to_string().into()
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name(Rc::from(s))
    }
}

impl From<String> for Name {
    fn from(s: String) -> Self {
        Name(Rc::from(s.as_str()))
    }
}

impl std::borrow::Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}
