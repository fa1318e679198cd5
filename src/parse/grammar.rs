use winnow::ascii::{line_ending, till_line_ending};
use winnow::combinator::{alt, cut_err, eof, opt, preceded, repeat, terminated};
use winnow::error::{ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{none_of, take_while};

use super::RedirectEntry;

// -- Whitespace & comments --------------------------------------------------

fn inline_ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., |c: char| c == ' ' || c == '\t')
        .void()
        .parse_next(input)
}

fn comment(input: &mut &str) -> ModalResult<()> {
    ('#', till_line_ending).void().parse_next(input)
}

fn line_end(input: &mut &str) -> ModalResult<()> {
    (
        inline_ws,
        opt(comment),
        alt((line_ending.void(), eof.void())),
    )
        .void()
        .parse_next(input)
}

fn blank_line(input: &mut &str) -> ModalResult<()> {
    alt((
        (inline_ws, opt(comment), line_ending).void(),
        (inline_ws, comment, eof).void(),
    ))
    .parse_next(input)
}

// -- Entries ----------------------------------------------------------------

fn escaped_char(input: &mut &str) -> ModalResult<char> {
    alt((
        '"'.value('"'),
        '\\'.value('\\'),
        'n'.value('\n'),
        't'.value('\t'),
        'r'.value('\r'),
    ))
    .parse_next(input)
}

fn quoted_char(input: &mut &str) -> ModalResult<char> {
    alt((preceded('\\', cut_err(escaped_char)), none_of(['"', '\\']))).parse_next(input)
}

/// `"..."` with `\"`, `\\`, `\n`, `\t` and `\r` escapes.
fn quoted(input: &mut &str) -> ModalResult<String> {
    preceded(
        '"',
        cut_err(terminated(repeat(0.., quoted_char), '"')).context(StrContext::Expected(
            StrContextValue::Description("closing quote"),
        )),
    )
    .parse_next(input)
}

fn bare<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(1.., |c: char| !c.is_whitespace()).parse_next(input)
}

fn url_token(input: &mut &str) -> ModalResult<String> {
    alt((quoted, bare.map(str::to_owned))).parse_next(input)
}

fn entry(input: &mut &str) -> ModalResult<RedirectEntry> {
    inline_ws.parse_next(input)?;
    let disabled = opt(('!', inline_ws)).parse_next(input)?.is_some();

    let source = url_token
        .context(StrContext::Expected(StrContextValue::Description(
            "source URL",
        )))
        .parse_next(input)?;

    inline_ws.parse_next(input)?;
    cut_err("->")
        .context(StrContext::Expected(StrContextValue::StringLiteral("->")))
        .parse_next(input)?;
    inline_ws.parse_next(input)?;

    let destination = cut_err(url_token)
        .context(StrContext::Expected(StrContextValue::Description(
            "destination URL",
        )))
        .parse_next(input)?;

    cut_err(line_end)
        .context(StrContext::Expected(StrContextValue::Description(
            "end of line",
        )))
        .parse_next(input)?;

    Ok(RedirectEntry {
        source,
        destination,
        enabled: !disabled,
    })
}

// -- Top-level parser -------------------------------------------------------

pub fn redirect_list(input: &mut &str) -> ModalResult<Vec<RedirectEntry>> {
    let lines: Vec<Option<RedirectEntry>> =
        repeat(0.., alt((blank_line.value(None), entry.map(Some)))).parse_next(input)?;
    (inline_ws, eof).void().parse_next(input)?;
    Ok(lines.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use crate::parse::parse;

    #[test]
    fn parse_single_entry() {
        let entries = parse("https://old.example.com -> https://new.example.org:8443").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source, "https://old.example.com");
        assert_eq!(entries[0].destination, "https://new.example.org:8443");
        assert!(entries[0].enabled);
    }

    #[test]
    fn parse_disabled_marker() {
        let entries = parse("! https://a.example -> https://b.example\n").unwrap();
        assert!(!entries[0].enabled);
        let entries = parse("!https://a.example -> https://b.example").unwrap();
        assert!(!entries[0].enabled);
        assert_eq!(entries[0].source, "https://a.example");
    }

    #[test]
    fn parse_comments_and_blank_lines() {
        let input = "# header\n\n   \nhttps://a.example -> https://b.example  # trailing\n# footer";
        let entries = parse(input).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].destination, "https://b.example");
    }

    #[test]
    fn parse_crlf_line_endings() {
        let input = "https://a.example -> https://b.example\r\nhttps://c.example -> https://d.example\r\n";
        assert_eq!(parse(input).unwrap().len(), 2);
    }

    #[test]
    fn parse_empty_input() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("  \n\t\n").unwrap().is_empty());
    }

    #[test]
    fn urls_are_not_validated() {
        let entries = parse("garbage -> also-garbage").unwrap();
        assert_eq!(entries[0].source, "garbage");
    }

    #[test]
    fn missing_arrow_is_error() {
        assert!(parse("https://a.example https://b.example").is_err());
    }

    #[test]
    fn missing_destination_is_error() {
        assert!(parse("https://a.example ->\n").is_err());
    }

    #[test]
    fn quoted_tokens_unescape() {
        let entries = parse(r#""not a url" -> "say \"hi\"\\now""#).unwrap();
        assert_eq!(entries[0].source, "not a url");
        assert_eq!(entries[0].destination, r#"say "hi"\now"#);
        assert!(entries[0].enabled);
    }

    #[test]
    fn quoted_bang_is_not_disabled_marker() {
        let entries = parse(r#""!https://a.example" -> https://b.example"#).unwrap();
        assert!(entries[0].enabled);
        assert_eq!(entries[0].source, "!https://a.example");

        let entries = parse(r#"! "!https://a.example" -> https://b.example"#).unwrap();
        assert!(!entries[0].enabled);
        assert_eq!(entries[0].source, "!https://a.example");
    }

    #[test]
    fn unterminated_quote_is_error() {
        assert!(parse(r#""https://a.example -> https://b.example"#).is_err());
    }

    #[test]
    fn unknown_escape_is_error() {
        assert!(parse(r#""a\qb" -> https://b.example"#).is_err());
    }

    #[test]
    fn extra_token_is_error() {
        assert!(parse("https://a.example -> https://b.example extra").is_err());
    }
}
