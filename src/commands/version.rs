//! Command: print version information.

/// The build version: `git describe` output when available.
#[must_use]
pub fn version() -> &'static str {
    option_env!("DODOT_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the dodot version to stdout.
#[allow(clippy::print_stdout)]
pub fn run() {
    println!("dodot {}", version());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_never_empty() {
        assert!(!version().trim().is_empty());
    }
}
