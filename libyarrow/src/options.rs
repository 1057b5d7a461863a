//! Engine configuration.

/// Knobs shared by the pipeline stages. The defaults match common YAML
/// processor behavior; construct with struct-update syntax to override:
///
/// ```
/// use libyarrow::Options;
/// let options = Options {
///     allow_tab_indent: true,
///     ..Options::default()
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Maximum node nesting depth the composer will build before
    /// reporting an error.
    pub max_nesting_depth: usize,
    /// Accept tabs where block structure would otherwise require spaces.
    pub allow_tab_indent: bool,
    /// Require every document to open with an explicit `---` marker.
    pub require_document_markers: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_nesting_depth: 1024,
            allow_tab_indent: false,
            require_document_markers: false,
        }
    }
}
