//! Per-subtree usage/size analysis that feeds the inlining heuristics.

use indexmap::IndexMap;

use crate::ident::Level;

/// How many times a level is referenced in a subtree, and whether any of
/// those references happen under a closure that could outlive the
/// enclosing binder (a "capture").
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Usage {
    pub count: u32,
    pub captured: bool,
}

impl Usage {
    fn combine(self, other: Usage) -> Usage {
        Usage {
            count: self.count + other.count,
            captured: self.captured || other.captured,
        }
    }

    fn scale(self, n: u32) -> Usage {
        Usage {
            count: self.count * n,
            captured: self.captured,
        }
    }
}

/// A coarse complexity ordering used by the inlining heuristics.
/// `Trivial < Deref < KnownSize < NonTrivial`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Complexity {
    Trivial,
    Deref,
    KnownSize,
    NonTrivial,
}

impl Default for Complexity {
    fn default() -> Self {
        Complexity::Trivial
    }
}

/// A hint about the shape of one argument position of a binding, used by
/// `shouldInlineExternApp` to compare a callee's declared arity against
/// the number of arguments actually supplied at a call site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArgumentShape {
    /// No useful shape information was recovered for this position.
    Unknown,
    /// The argument position is itself applied as a function.
    Unapplied,
}

/// The metadata bag attached to every IR node.
///
/// Combination is monoidal: `usages` sums per level, `size` sums,
/// `complexity` takes the max, `args` concatenates, and `rewrite` is
/// boolean-or. The identity element is `BackendAnalysis::default()`.
#[derive(Clone, Debug, Default)]
pub struct BackendAnalysis {
    pub usages: IndexMap<Level, Usage>,
    pub size: u32,
    pub complexity: Complexity,
    pub args: Vec<ArgumentShape>,
    pub rewrite: bool,
}

impl BackendAnalysis {
    /// A single reference to `level`, `size` 1, `Trivial` complexity.
    pub fn var_use(level: Level) -> Self {
        let mut usages = IndexMap::new();
        usages.insert(
            level,
            Usage {
                count: 1,
                captured: false,
            },
        );
        BackendAnalysis {
            usages,
            size: 1,
            complexity: Complexity::Trivial,
            args: Vec::new(),
            rewrite: false,
        }
    }

    pub fn leaf(complexity: Complexity) -> Self {
        BackendAnalysis {
            size: 1,
            complexity,
            ..Default::default()
        }
    }

    /// Monoidal combination of any number of subtree analyses.
    pub fn combine_all<'a>(parts: impl IntoIterator<Item = &'a BackendAnalysis>) -> Self {
        let mut acc = BackendAnalysis::default();
        for part in parts {
            acc = acc.combine(part);
        }
        acc
    }

    pub fn combine(&self, other: &BackendAnalysis) -> Self {
        let mut usages = self.usages.clone();
        for (&level, usage) in &other.usages {
            usages
                .entry(level)
                .and_modify(|existing| *existing = existing.combine(*usage))
                .or_insert(*usage);
        }
        let mut args = self.args.clone();
        args.extend(other.args.iter().cloned());
        BackendAnalysis {
            usages,
            size: self.size + other.size,
            complexity: self.complexity.max(other.complexity),
            args,
            rewrite: self.rewrite || other.rewrite,
        }
    }

    /// Scalar multiplication: models the cost of `n`-fold inlining of this
    /// subtree (each usage site gets its own copy of `size` and of every
    /// usage count it carries).
    pub fn scale(&self, n: u32) -> Self {
        BackendAnalysis {
            usages: self
                .usages
                .iter()
                .map(|(&level, &usage)| (level, usage.scale(n)))
                .collect(),
            size: self.size * n,
            complexity: self.complexity,
            args: self.args.clone(),
            rewrite: self.rewrite,
        }
    }

    /// Mark `level` as bound: it is no longer free in an outer context, so
    /// it's removed from `usages` (its usage count was only meaningful to
    /// the scope that just closed over it).
    pub fn bound(mut self, level: Level) -> Self {
        self.usages.shift_remove(&level);
        self
    }

    /// Mark every currently-free usage as captured: the subtree this
    /// analysis describes sits inside a closure (an `Abs` body, a
    /// `LetRec` member) that may be invoked any number of times, so a
    /// textual usage count of 1 no longer means "evaluated once" —
    /// `shouldInlineLet`'s single-use rule must not fire on it.
    pub fn mark_captured(mut self) -> Self {
        for usage in self.usages.values_mut() {
            usage.captured = true;
        }
        self
    }

    pub fn with_rewrite(mut self) -> Self {
        self.rewrite = true;
        self
    }

    pub fn usage_of(&self, level: Level) -> Usage {
        self.usages.get(&level).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod analysis_tests;
