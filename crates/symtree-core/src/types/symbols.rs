//! Resolved symbol annotations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result of resolving one address against one binary.
///
/// A frame carries zero (unresolved), one, or several of these; several
/// entries describe an inline chain. Ordering is defined by the resolver and
/// the first entry is the primary symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo
{
    /// Raw (possibly mangled) symbol name.
    pub symbol: String,
    /// Human-friendly name when the resolver could demangle `symbol`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demangled_symbol: Option<String>,
    /// Distance in bytes from the symbol start to the resolved address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(rename = "lineNumber", default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl SymbolInfo
{
    /// Symbol with no demangling, offset, or source location.
    pub fn new(symbol: impl Into<String>) -> Self
    {
        Self {
            symbol: symbol.into(),
            demangled_symbol: None,
            offset: None,
            file: None,
            line: None,
        }
    }

    #[must_use]
    pub fn with_offset(mut self, offset: u64) -> Self
    {
        self.offset = Some(offset);
        self
    }

    #[must_use]
    pub fn with_demangled(mut self, demangled: impl Into<String>) -> Self
    {
        self.demangled_symbol = Some(demangled.into());
        self
    }

    #[must_use]
    pub fn with_location(mut self, file: impl Into<String>, line: Option<u32>) -> Self
    {
        self.file = Some(file.into());
        self.line = line;
        self
    }

    /// Preferred presentation (demangled fallback to raw).
    pub fn display_name(&self) -> &str
    {
        self.demangled_symbol.as_deref().unwrap_or(&self.symbol)
    }
}

impl fmt::Display for SymbolInfo
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "<Symbol: {}", self.symbol)?;
        if let Some(offset) = self.offset {
            write!(f, " + {offset}")?;
        }
        if let Some(file) = &self.file {
            write!(f, " {file}")?;
        }
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
        }
        write!(f, ">")
    }
}
