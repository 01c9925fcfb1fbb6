use ropey::Rope;
use tower_lsp_server::ls_types::Position;

/// Convert an LSP `Position` into a character-offset.
pub fn position_to_offset(position: Position, rope: &Rope) -> Option<usize> {
    let line_idx = position.line as usize;
    if line_idx >= rope.len_lines() {
        return None;
    }

    let line_start = rope.try_line_to_char(line_idx).ok()?;
    let column = position.character as usize;
    let line_slice = rope.line(line_idx);
    if column > line_slice.len_chars() {
        return None;
    }

    Some(line_start + column)
}

/// Split a document into lines without their terminators.
pub fn rope_lines(rope: &Rope) -> Vec<String> {
    rope.lines()
        .map(|line| {
            let mut text = line.to_string();
            if text.ends_with('\n') {
                text.pop();
                if text.ends_with('\r') {
                    text.pop();
                }
            }
            text
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_drop_terminators() {
        let rope = Rope::from_str("- [ch1] one\r\n- [ch2] two\n");
        assert_eq!(rope_lines(&rope), ["- [ch1] one", "- [ch2] two", ""]);
    }

    #[test]
    fn positions_map_to_char_offsets() {
        let rope = Rope::from_str("abc\n- [ch");
        let offset = position_to_offset(Position::new(1, 5), &rope).expect("offset");
        assert_eq!(offset, 9);
        assert_eq!(position_to_offset(Position::new(1, 9), &rope), None);
        assert_eq!(position_to_offset(Position::new(5, 0), &rope), None);
    }
}
