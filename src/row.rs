//! Line splitting for lead sheets.
//!
//! Lenient by intent: quote characters only toggle whether the delimiter
//! splits, they are never kept, and an unbalanced quote simply runs to the
//! end of the line instead of failing.

/// Split one line (no embedded newline) into trimmed cells.
///
/// A `"` toggles the inside-quotes state; `delimiter` only splits outside
/// quotes. Each cell is trimmed and one surrounding `"` or `'` is removed
/// from either end. Whitespace-only lines yield no cells.
pub fn split_row(line: &str, delimiter: char) -> Vec<String> {
    if line.trim().is_empty() {
        return Vec::new();
    }

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut inside_quotes = false;

    for ch in line.chars() {
        if ch == '"' {
            inside_quotes = !inside_quotes;
        } else if ch == delimiter && !inside_quotes {
            cells.push(clean_cell(&current));
            current.clear();
        } else {
            current.push(ch);
        }
    }
    cells.push(clean_cell(&current));

    cells
}

fn clean_cell(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix(['"', '\''])
        .unwrap_or(trimmed);
    let trimmed = trimmed
        .strip_suffix(['"', '\''])
        .unwrap_or(trimmed);
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::clean_cell;

    #[test]
    fn strips_one_layer_of_single_quotes() {
        assert_eq!(clean_cell("  'Cairo' "), "Cairo");
        assert_eq!(clean_cell("''x''"), "'x'");
        assert_eq!(clean_cell("O'Brien"), "O'Brien");
    }
}
