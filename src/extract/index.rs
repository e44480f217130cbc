use super::UnitError;

/// `PAGE. headword (gloss)`. Blank, comment and non-numbered lines yield
/// `Ok(None)`.
pub fn parse_headword_line(line_no: usize, line: &str) -> Result<Option<(u32, String)>, UnitError> {
    let stripped = line.trim();
    if !stripped.starts_with(|c: char| c.is_ascii_digit()) {
        return Ok(None);
    }
    let (number, rest) = stripped.split_once('.').unwrap_or((stripped, ""));
    let page = parse_page(line_no, number)?;
    let headword = rest.split('(').next().unwrap_or_default();
    let headword = headword.trim().trim_end_matches(['\u{0F0B}', ' ']);
    if headword.is_empty() {
        return Ok(None);
    }
    Ok(Some((page, headword.to_string())))
}

/// `headword<DELIM>page`, as produced from a PDF outline.
pub fn parse_toc_line(
    line_no: usize,
    line: &str,
    delimiter: char,
) -> Result<Option<(u32, String)>, UnitError> {
    let stripped = line.trim();
    if stripped.is_empty() || stripped.starts_with('#') {
        return Ok(None);
    }
    let Some((head, page)) = stripped.rsplit_once(delimiter) else {
        return Err(UnitError::MissingField {
            line: line_no,
            delimiter,
        });
    };
    let page = parse_page(line_no, page)?;
    let head = head.trim();
    if head.is_empty() {
        return Ok(None);
    }
    Ok(Some((page, head.to_string())))
}

fn parse_page(line_no: usize, value: &str) -> Result<u32, UnitError> {
    value.trim().parse().map_err(|_| UnitError::BadPage {
        line: line_no,
        value: value.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headword_index_lines() {
        assert_eq!(
            parse_headword_line(1, "12. ka ba (a pillar)").unwrap(),
            Some((12, "ka ba".to_string()))
        );
        assert_eq!(
            parse_headword_line(2, "  7. ཀ་བ་ ").unwrap(),
            Some((7, "ཀ་བ".to_string()))
        );
        assert_eq!(parse_headword_line(3, "# comment").unwrap(), None);
        assert_eq!(parse_headword_line(4, "Preface").unwrap(), None);
        assert_eq!(parse_headword_line(5, "9. (gloss only)").unwrap(), None);
    }

    #[test]
    fn bad_page_number_is_an_error() {
        let err = parse_headword_line(8, "12a. ka").unwrap_err();
        assert!(matches!(err, UnitError::BadPage { line: 8, .. }));
    }

    #[test]
    fn toc_lines() {
        assert_eq!(
            parse_toc_line(1, "bka' 'gyur|27", '|').unwrap(),
            Some((27, "bka' 'gyur".to_string()))
        );
        assert_eq!(parse_toc_line(2, "", '|').unwrap(), None);
        assert!(matches!(
            parse_toc_line(3, "no delimiter", '|'),
            Err(UnitError::MissingField { line: 3, .. })
        ));
        assert!(matches!(
            parse_toc_line(4, "ka|twelve", '|'),
            Err(UnitError::BadPage { .. })
        ));
    }
}
