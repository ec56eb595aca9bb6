//! Identifiers, qualification, and de Bruijn levels.

use crate::interner::Symbol;

/// An unqualified identifier, interned for O(1) comparison.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Ident(pub Symbol);

impl Ident {
    #[inline]
    pub fn from_symbol(sym: Symbol) -> Self {
        Self(sym)
    }

    #[inline]
    pub fn symbol(self) -> Symbol {
        self.0
    }
}

/// An opaque module name, interned the same way as `Ident`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ModuleName(pub Symbol);

impl ModuleName {
    #[inline]
    pub fn from_symbol(sym: Symbol) -> Self {
        Self(sym)
    }

    #[inline]
    pub fn symbol(self) -> Symbol {
        self.0
    }
}

/// A name qualified by the module that defines it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Qualified<T> {
    pub module: ModuleName,
    pub name: T,
}

impl<T> Qualified<T> {
    pub fn new(module: ModuleName, name: T) -> Self {
        Self { module, name }
    }
}

/// A de Bruijn level: a binder's position counted from the outermost.
///
/// Levels are allocated by the quoter as it opens closures and never
/// reused; equality is identity, exactly the bare `u32` comparison below.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Level(pub u32);

impl Level {
    #[inline]
    pub fn next(self) -> Level {
        Level(self.0 + 1)
    }
}
