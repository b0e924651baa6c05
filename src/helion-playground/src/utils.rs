//! Print helpers for demo binaries.

/// Print a boxed header.
pub fn print_header(title: &str) {
    let line = "=".repeat(title.len() + 4);
    println!("{line}");
    println!("  {title}");
    println!("{line}");
}

/// Print a section divider.
pub fn print_section(title: &str) {
    println!();
    println!("--- {title} ---");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_helpers_do_not_panic() {
        print_header("Helion");
        print_section("cutflow");
    }
}
