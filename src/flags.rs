//! Build, apply and wrap flags, plus the compile-time limits they interact with.

bitflags::bitflags! {
    /// Flags that affect how the compiler scans a template.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BuildFlags: u32 {
        /// Treat a leading `:` as a literal-content tag rather than rejecting it.
        const WITH_COLON        = 1 << 0;
        /// Permit an empty tag name (`{{}}`) instead of raising `EmptyTag`.
        const WITH_EMPTY_TAG    = 1 << 1;
        /// Copy tag names into an owned pool instead of referencing the source text.
        const NULL_TERM_TAG     = 1 << 2;
        /// Copy literal text runs into an owned pool instead of referencing the source text.
        const NULL_TERM_TEXT    = 1 << 3;
    }
}

impl Default for BuildFlags {
    fn default() -> Self {
        BuildFlags::empty()
    }
}

bitflags::bitflags! {
    /// Flags that affect how the applier drives the low-level provider.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ApplyFlags: u32 {
        /// Try the global/default partial resolution before the provider's own.
        const GLOBAL_PARTIAL_FIRST = 1 << 0;
    }
}

impl Default for ApplyFlags {
    fn default() -> Self {
        ApplyFlags::empty()
    }
}

bitflags::bitflags! {
    /// Flags that control the path syntax the wrap layer accepts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WrapFlags: u32 {
        const WITH_COMPARE       = 1 << 0;
        const WITH_EQUAL         = 1 << 1;
        const WITH_JSON_POINTER  = 1 << 2;
        const WITH_OBJECT_ITER   = 1 << 3;
        const WITH_SINGLE_DOT    = 1 << 4;
        const WITH_INC_PARTIAL   = 1 << 5;
        const WITH_ESC_FIRST_CMP = 1 << 6;
        const ERROR_UNDEFINED    = 1 << 7;
        const PARTIAL_DATA_FIRST = 1 << 8;

        const ALL_EXTENSIONS = Self::WITH_COMPARE.bits()
            | Self::WITH_EQUAL.bits()
            | Self::WITH_JSON_POINTER.bits()
            | Self::WITH_OBJECT_ITER.bits()
            | Self::WITH_SINGLE_DOT.bits()
            | Self::WITH_INC_PARTIAL.bits()
            | Self::WITH_ESC_FIRST_CMP.bits();
    }
}

impl Default for WrapFlags {
    fn default() -> Self {
        WrapFlags::ALL_EXTENSIONS
    }
}

/// Compile-time tunable bounds, threaded explicitly through `compile`/`apply`
/// rather than read from global state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum static section nesting depth the compiler accepts.
    pub max_depth: u32,
    /// Maximum partial recursion depth the applier accepts.
    pub max_nesting: u32,
    /// Largest representable word value (jump addresses, offsets).
    pub word_max: u32,
    /// Largest representable tag length/immediate (28-bit field).
    pub tag_value_max: u32,
}

impl Limits {
    pub const DEFAULT: Limits = Limits {
        max_depth: 32,
        max_nesting: 32,
        word_max: u32::MAX,
        tag_value_max: (1 << 28) - 1,
    };
}

impl Default for Limits {
    fn default() -> Self {
        Limits::DEFAULT
    }
}
