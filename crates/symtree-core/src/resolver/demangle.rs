//! Symbol demangling.
//!
//! Rust symbols (legacy `_ZN...` and v0 `_R...`) are demangled with
//! `rustc_demangle`. Mach-O symbol tables prefix every C-level name with an
//! extra underscore, so `__ZN...` and `__R...` are accepted too. Anything
//! else (C, Objective-C, Swift) is returned as `None` and shown raw.

use rustc_demangle::try_demangle;

/// Demangle `raw`, or `None` when it is not a Rust symbol.
#[must_use]
pub fn demangle_symbol(raw: &str) -> Option<String>
{
    let candidate = raw
        .strip_prefix('_')
        .filter(|rest| rest.starts_with("_ZN") || rest.starts_with("_R"))
        .unwrap_or(raw);

    // `{:#}` drops the trailing hash
    try_demangle(candidate).ok().map(|demangled| format!("{demangled:#}"))
}

/// Strip the Mach-O leading underscore from a symbol-table name.
pub(crate) fn strip_macho_underscore(raw: &str) -> &str
{
    raw.strip_prefix('_').unwrap_or(raw)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_demangle_legacy()
    {
        let demangled = demangle_symbol("_ZN4core3fmt5write17h0123456789abcdefE");
        assert_eq!(demangled.as_deref(), Some("core::fmt::write"));
    }

    #[test]
    fn test_demangle_macho_prefixed()
    {
        let demangled = demangle_symbol("__ZN4core3fmt5write17h0123456789abcdefE");
        assert_eq!(demangled.as_deref(), Some("core::fmt::write"));
    }

    #[test]
    fn test_non_rust_symbols_are_left_alone()
    {
        assert_eq!(demangle_symbol("main"), None);
        assert_eq!(demangle_symbol("_objc_msgSend"), None);
    }
}
