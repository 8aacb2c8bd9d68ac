//! Output formatting utilities
//!
//! Every helper writes to the stream handed in by the caller so command
//! output can be captured in tests.

pub mod table_output;

use crate::error::Result;
use console::style;
use serde::Serialize;
use std::io::Write;

/// Output data as JSON
pub fn json_output<T: Serialize>(out: &mut dyn Write, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    writeln!(out, "{json}")?;
    Ok(())
}

/// Print a success message with green checkmark
pub fn print_success(out: &mut dyn Write, message: &str) -> Result<()> {
    writeln!(out, "{} {}", style("✓").green().bold(), message)?;
    Ok(())
}

/// Print an error message with red X
pub fn print_error(out: &mut dyn Write, message: &str) -> Result<()> {
    writeln!(out, "{} {}", style("✗").red().bold(), style(message).red())?;
    Ok(())
}

/// Print an informational message with blue info icon
pub fn print_info(out: &mut dyn Write, message: &str) -> Result<()> {
    writeln!(out, "{} {}", style("ℹ").blue(), message)?;
    Ok(())
}

/// Print a warning with yellow marker
pub fn print_warning(out: &mut dyn Write, message: &str) -> Result<()> {
    writeln!(out, "{} {}", style("!").yellow().bold(), style(message).yellow())?;
    Ok(())
}

/// Print a security/auth related message
pub fn print_auth(out: &mut dyn Write, message: &str) -> Result<()> {
    writeln!(out, "{} {}", style("🔐").cyan(), message)?;
    Ok(())
}

/// Compress a path to use tilde notation for home directory
pub fn compress_path(path: &std::path::Path) -> String {
    if let Ok(home_dir) = etcetera::home_dir() {
        if let Ok(relative) = path.strip_prefix(&home_dir) {
            return format!("~/{}", relative.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_go_to_given_stream() {
        let mut out = Vec::new();
        print_success(&mut out, "Container 200 started successfully").unwrap();
        print_error(&mut out, "Not configured").unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Container 200 started successfully"));
        assert!(text.contains("Not configured"));
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_compress_path_outside_home() {
        let path = std::path::Path::new("/etc/proxctl/config.json");
        assert_eq!(compress_path(path), "/etc/proxctl/config.json");
    }
}
