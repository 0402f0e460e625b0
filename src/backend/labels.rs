use crate::error::TranslateError;
use crate::frontend::instruction::Segment;
use std::collections::{HashMap, HashSet};

/// Base address of the temp segment (R5..R12).
pub const TEMP_BASE: u16 = 5;

/// Scratch registers used by pop and by the return sequence.
pub const SCRATCH_ADDR: &str = "R13";
pub const SCRATCH_RET: &str = "R14";

/// Label and symbol state for one translation run.
///
/// Every counter lives here rather than in process globals, so each run
/// starts from zero and two runs over the same source produce identical
/// output. One instance spans all units of a submission, which is what
/// makes generated labels unique across the whole translation.
#[derive(Debug, Default)]
pub struct Labels {
    unit: String,
    function: String,
    counters: HashMap<String, u32>,
    issued: HashSet<String>,
}

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new translation unit. Until the first `function`
    /// directive, the unit name scopes flow labels so that top-level
    /// labels in different units cannot collide.
    pub fn enter_unit(&mut self, name: &str) {
        self.unit = name.to_string();
        self.function = name.to_string();
    }

    pub fn enter_function(&mut self, name: &str) {
        self.function = name.to_string();
    }

    pub fn current_unit(&self) -> &str {
        &self.unit
    }

    pub fn current_function(&self) -> &str {
        &self.function
    }

    /// The assembly name of a source-level flow label, namespaced by the
    /// active function.
    pub fn flow_label(&self, name: &str) -> String {
        format!("{}${}", self.function, name)
    }

    /// Registers a caller-named label definition (function entry or
    /// source `label`). Returns false when that name was already taken.
    pub fn define(&mut self, label: &str) -> bool {
        self.issued.insert(label.to_string())
    }

    /// A label pair for one comparison site: the branch target taken when
    /// the comparison holds and the merge point after both arms.
    pub fn comparison_pair(
        &mut self,
        category: &str,
    ) -> Result<(String, String), TranslateError> {
        let n = self.fresh(category);
        let when_true = format!("{}${}.{}.true", self.function, category, n);
        let end = format!("{}${}.{}.end", self.function, category, n);
        self.issue(&when_true)?;
        self.issue(&end)?;
        Ok((when_true, end))
    }

    /// A return-address label for one call site.
    pub fn return_label(&mut self) -> Result<String, TranslateError> {
        let n = self.fresh("ret");
        let label = format!("{}$ret.{}", self.function, n);
        self.issue(&label)?;
        Ok(label)
    }

    /// The assembly symbol backing `static index` in the current unit.
    pub fn static_symbol(&self, index: u16) -> String {
        format!("{}.{}", self.unit, index)
    }

    fn fresh(&mut self, category: &str) -> u32 {
        let counter = self.counters.entry(category.to_string()).or_insert(0);
        let n = *counter;
        *counter += 1;
        n
    }

    fn issue(&mut self, label: &str) -> Result<(), TranslateError> {
        if self.issued.insert(label.to_string()) {
            return Ok(());
        }
        // Counters only move forward, so a repeat means the allocator
        // state was corrupted.
        Err(TranslateError::Internal {
            message: format!("generated label `{}` issued twice", label),
        })
    }
}

/// The base-pointer symbol a segment is addressed through, for segments
/// that have one. Constant, static, temp and pointer resolve differently
/// and return None.
pub fn segment_base(segment: Segment) -> Option<&'static str> {
    match segment {
        Segment::Local => Some("LCL"),
        Segment::Argument => Some("ARG"),
        Segment::This => Some("THIS"),
        Segment::That => Some("THAT"),
        Segment::Constant | Segment::Static | Segment::Temp | Segment::Pointer => None,
    }
}

/// The symbol addressed by `pointer 0` / `pointer 1`. Indices above 1
/// are rejected by the parser.
pub fn pointer_symbol(index: u16) -> &'static str {
    if index == 0 { "THIS" } else { "THAT" }
}
