//! Input schedule file parsing (§6): one `<tick> <value>` pair per
//! line. `<value>` is decimal if it parses as an integer, otherwise a
//! single character converted to its codepoint. No direct teacher
//! analogue — `vex`/`vasm` have no input-schedule concept at all — so
//! this is grounded directly on spec.md's literal file-format
//! description.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("line {line}: expected \"<tick> <value>\", got {content:?}")]
    MalformedLine { line: usize, content: String },
    #[error("line {line}: tick {content:?} is not a valid integer")]
    InvalidTick { line: usize, content: String },
    #[error("line {line}: value {content:?} is neither an integer nor a single character")]
    InvalidValue { line: usize, content: String },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ScheduleEntry {
    pub tick: u64,
    pub value: i32,
}

/// Parses the schedule text and returns entries sorted by tick. The
/// sort is stable, so entries sharing a tick keep their file order —
/// spec.md §5: "values enqueued into input_buffer appear in schedule
/// order."
pub fn parse(text: &str) -> Result<Vec<ScheduleEntry>, ScheduleError> {
    let mut entries = Vec::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        let mut parts = line.splitn(2, char::is_whitespace);
        let tick_field = parts.next().unwrap_or("");
        let value_field = parts.next().unwrap_or("").trim();
        if tick_field.is_empty() || value_field.is_empty() {
            return Err(ScheduleError::MalformedLine { line: index + 1, content: line.to_string() });
        }

        let tick: u64 = tick_field
            .parse()
            .map_err(|_| ScheduleError::InvalidTick { line: index + 1, content: tick_field.to_string() })?;

        let value = parse_value(value_field)
            .ok_or_else(|| ScheduleError::InvalidValue { line: index + 1, content: value_field.to_string() })?;

        entries.push(ScheduleEntry { tick, value });
    }

    entries.sort_by_key(|entry| entry.tick);
    Ok(entries)
}

fn parse_value(field: &str) -> Option<i32> {
    if let Ok(n) = field.parse::<i32>() {
        return Some(n);
    }
    let mut chars = field.chars();
    let only = chars.next()?;
    if chars.next().is_none() {
        Some(only as i32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_values_parse_as_integers() {
        let entries = parse("10 65\n20 -3").unwrap();
        assert_eq!(entries, vec![
            ScheduleEntry { tick: 10, value: 65 },
            ScheduleEntry { tick: 20, value: -3 },
        ]);
    }

    #[test]
    fn single_character_values_become_codepoints() {
        let entries = parse("10 H\n20 i").unwrap();
        assert_eq!(entries[0], ScheduleEntry { tick: 10, value: 'H' as i32 });
        assert_eq!(entries[1], ScheduleEntry { tick: 20, value: 'i' as i32 });
    }

    #[test]
    fn entries_are_sorted_by_tick_and_ties_keep_file_order() {
        let entries = parse("20 2\n10 1\n10 0").unwrap();
        assert_eq!(entries[0].tick, 10);
        assert_eq!(entries[0].value, 1);
        assert_eq!(entries[1].tick, 10);
        assert_eq!(entries[1].value, 0);
        assert_eq!(entries[2].tick, 20);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let entries = parse("\n10 5\n\n").unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn a_line_with_only_a_tick_is_malformed() {
        let err = parse("10").unwrap_err();
        assert!(matches!(err, ScheduleError::MalformedLine { .. }));
    }

    #[test]
    fn a_non_numeric_multi_character_value_is_invalid() {
        let err = parse("10 abc").unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidValue { .. }));
    }
}
