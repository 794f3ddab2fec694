//! Terminal rendering helpers for the REPL.

use datacopilot_agent::PREVIEW_WIDTH;

/// A horizontal rule the width of a preview.
pub fn rule() -> String {
    "─".repeat(PREVIEW_WIDTH)
}

/// Draw `lines` inside a box, padded to the widest line.
pub fn boxed(lines: &[&str]) -> String {
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let mut out = format!("╭{}╮\n", "─".repeat(width + 2));
    for line in lines {
        let pad = width - line.chars().count();
        out.push_str(&format!("│ {line}{} │\n", " ".repeat(pad)));
    }
    out.push_str(&format!("╰{}╯", "─".repeat(width + 2)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_pads_to_widest_line() {
        let b = boxed(&["Data Copilot", "hi"]);
        let lines: Vec<&str> = b.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "│ Data Copilot │");
        assert_eq!(lines[2], "│ hi           │");
        assert!(lines.iter().all(|l| l.chars().count() == 16));
    }

    #[test]
    fn rule_matches_preview_width() {
        assert_eq!(rule().chars().count(), PREVIEW_WIDTH);
    }
}
