//! Splitting of a single CSV record into fields.

/// Split `input` on commas, honoring double-quoted fields.
///
/// Inside quotes `""` stands for a literal quote. An empty input has no fields.
pub(crate) fn split(input: &str) -> Result<Vec<String>, String> {
    if input.is_empty() {
        return Ok(Vec::new());
    }

    let mut fields = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        let mut field = String::new();

        if chars.peek() == Some(&'"') {
            chars.next();
            loop {
                match chars.next() {
                    Some('"') if chars.peek() == Some(&'"') => {
                        chars.next();
                        field.push('"');
                    }
                    Some('"') => break,
                    Some(c) => field.push(c),
                    None => return Err("extraneous or missing \" in quoted-field".to_string()),
                }
            }
            match chars.next() {
                None => {
                    fields.push(field);
                    return Ok(fields);
                }
                Some(',') => {}
                Some(_) => return Err("extraneous or missing \" in quoted-field".to_string()),
            }
        } else {
            loop {
                match chars.next() {
                    Some(',') => break,
                    Some('"') => return Err("bare \" in non-quoted-field".to_string()),
                    Some(c) => field.push(c),
                    None => {
                        fields.push(field);
                        return Ok(fields);
                    }
                }
            }
        }

        fields.push(field);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_fields() {
        assert_eq!(split("a,b=c,,d").unwrap(), vec!["a", "b=c", "", "d"]);
        assert_eq!(split("a,").unwrap(), vec!["a", ""]);
        assert!(split("").unwrap().is_empty());
    }

    #[test]
    fn quoted_fields() {
        assert_eq!(
            split(r#""name=x,y",required"#).unwrap(),
            vec!["name=x,y", "required"]
        );
        assert_eq!(split(r#""say ""hi""""#).unwrap(), vec![r#"say "hi""#]);
    }

    #[test]
    fn malformed_quotes() {
        assert!(split(r#"a"b"#).is_err());
        assert!(split(r#""open"#).is_err());
        assert!(split(r#""a"b"#).is_err());
    }
}
