//! Shaders and compile-time macro sets

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

use crate::render::api::{HardwareRenderer, ProgramHandle};

/// Set of preprocessor macros selecting a shader variant
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MacroSet {
    macros: BTreeSet<String>,
}

impl MacroSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable a macro
    pub fn enable(&mut self, name: impl Into<String>) {
        self.macros.insert(name.into());
    }

    /// Disable a macro
    pub fn disable(&mut self, name: &str) {
        self.macros.remove(name);
    }

    /// Whether a macro is enabled
    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains(name)
    }

    /// Enabled macros in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.macros.iter().map(String::as_str)
    }

    /// Whether no macro is enabled
    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Union of two sets
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            macros: self.macros.union(&other.macros).cloned().collect(),
        }
    }
}

impl<S: Into<String>> FromIterator<S> for MacroSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            macros: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Shader stage sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    /// Vertex stage
    pub vertex: String,
    /// Fragment stage
    pub fragment: String,
}

/// A shader with a per-macro-set program cache
///
/// Each macro set is compiled at most once. A failed compilation is cached
/// as well, so the error is logged once and later draws using the same
/// variant are skipped silently.
#[derive(Debug)]
pub struct Shader {
    name: String,
    source: ShaderSource,
    programs: RefCell<HashMap<MacroSet, Option<ProgramHandle>>>,
}

impl Shader {
    /// Create a shader from its sources
    pub fn new(name: impl Into<String>, vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: ShaderSource {
                vertex: vertex.into(),
                fragment: fragment.into(),
            },
            programs: RefCell::new(HashMap::new()),
        }
    }

    /// Shader name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stage sources
    pub const fn source(&self) -> &ShaderSource {
        &self.source
    }

    /// Program for a macro set, compiling it on first use
    ///
    /// Returns `None` when the variant failed to compile.
    pub fn program(&self, rhi: &mut dyn HardwareRenderer, macros: &MacroSet) -> Option<ProgramHandle> {
        if let Some(cached) = self.programs.borrow().get(macros) {
            return *cached;
        }

        let program = match rhi.compile_program(&self.source, macros) {
            Ok(program) => {
                log::debug!("Compiled shader '{}' variant {:?}", self.name, macros);
                Some(program)
            }
            Err(e) => {
                log::error!("Shader '{}' is invalid with macros {:?}: {}", self.name, macros, e);
                None
            }
        };
        self.programs.borrow_mut().insert(macros.clone(), program);
        program
    }

    /// Number of cached variants, including failed ones
    pub fn variant_count(&self) -> usize {
        self.programs.borrow().len()
    }

    /// Release every compiled variant and empty the cache
    ///
    /// Returns the number of programs released. A later [`Shader::program`]
    /// call compiles again.
    pub fn release_programs(&self, rhi: &mut dyn HardwareRenderer) -> usize {
        let programs: Vec<ProgramHandle> =
            self.programs.borrow_mut().drain().filter_map(|(_, program)| program).collect();
        for program in &programs {
            rhi.destroy_program(*program);
        }
        if !programs.is_empty() {
            log::debug!("Released {} programs of shader '{}'", programs.len(), self.name);
        }
        programs.len()
    }
}
