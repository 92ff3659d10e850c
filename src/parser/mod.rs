//! Recursive descent parser for setup sheets
//! Converts tokens into a `Sheet`
//!
//! ```text
//! units imperial
//! machine "Haas ST-20Y"
//! load 60
//! turn dia 1.0 sfm 300 ipr 0.010 material "4140" insert "CNMG (Rough)"
//! drill dia 1/2 rpm 500 ipm 2 material "Cast Iron" live autolimit
//! mill dia 0.5 rpm 8000 flutes 4 ipt 0.002 doc 0.25 woc 0.1
//! ```

use ariadne::{Config, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::ast::*;
use crate::calculator::{DrillingRequest, MillingRequest, Operation, OperationKind, TurningRequest};
use crate::lexer::{lex, Token};
use crate::units::UnitSystem;

/// Flute count used when a mill line leaves it out
pub const DEFAULT_FLUTES: u32 = 4;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unrecognized input")]
    Unrecognized { span: Span },

    #[error("expected {expected}, got {got}")]
    UnexpectedToken {
        expected: String,
        got: String,
        span: Span,
    },

    #[error("expected {expected}, got end of input")]
    UnexpectedEof { expected: String, span: Span },

    #[error("'{key}' given twice")]
    Duplicate { key: String, span: Span },

    #[error("'{key}' does not apply to {operation}")]
    NotApplicable {
        key: String,
        operation: OperationKind,
        span: Span,
    },

    #[error("{message}")]
    Invalid { message: String, span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::Unrecognized { span }
            | ParseError::UnexpectedToken { span, .. }
            | ParseError::UnexpectedEof { span, .. }
            | ParseError::Duplicate { span, .. }
            | ParseError::NotApplicable { span, .. }
            | ParseError::Invalid { span, .. } => span.clone(),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ParseError::Unrecognized { .. } => "not part of the sheet language",
            ParseError::UnexpectedToken { .. } | ParseError::UnexpectedEof { .. } => "here",
            ParseError::Duplicate { .. } => "repeated here",
            ParseError::NotApplicable { .. } => "remove this",
            ParseError::Invalid { .. } => "invalid value",
        }
    }

    /// Render as an ariadne diagnostic against the sheet source
    pub fn render(&self, name: &str, source: &str) -> String {
        let span = char_span(source, &self.span());
        let mut out = Vec::new();
        let written = Report::build(ReportKind::Error, name, span.start)
            .with_config(Config::default().with_color(false))
            .with_message(self.to_string())
            .with_label(Label::new((name, span)).with_message(self.label()))
            .finish()
            .write((name, Source::from(source)), &mut out);

        match written {
            Ok(()) => String::from_utf8_lossy(&out).into_owned(),
            Err(_) => format!("{}: {}", name, self),
        }
    }
}

/// ariadne counts characters, the lexer counts bytes
fn char_span(source: &str, span: &Span) -> Span {
    let to_char = |byte: usize| {
        source
            .get(..byte.min(source.len()))
            .map_or(0, |s| s.chars().count())
    };
    to_char(span.start)..to_char(span.end)
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Lex and parse a whole sheet
pub fn parse(source: &str) -> Result<Sheet> {
    let tokens = lex(source).map_err(|span| ParseError::Unrecognized { span })?;
    Parser::new(tokens, source.len()).parse()
}

pub struct Parser {
    tokens: Vec<(Token, logos::Span)>,
    position: usize,
    current_line: usize,
    end: usize,
}

/// Values collected from one job line
#[derive(Default)]
struct Fields {
    diameter: Option<f64>,
    speed: Option<f64>,
    rpm: Option<f64>,
    feed_per_rev: Option<f64>,
    feed_per_min: Option<f64>,
    chip_load: Option<f64>,
    flutes: Option<u32>,
    doc: Option<f64>,
    woc: Option<f64>,
    material: Option<String>,
    insert: Option<String>,
    live: bool,
    auto_limit: bool,
}

impl Parser {
    pub fn new(tokens: Vec<(Token, logos::Span)>, source_len: usize) -> Self {
        Self {
            tokens,
            position: 0,
            current_line: 1,
            end: source_len,
        }
    }

    /// Parse the full sheet
    pub fn parse(&mut self) -> Result<Sheet> {
        let mut units = None;
        let mut statements = Vec::new();

        loop {
            self.skip_newlines();
            let span = self.span();
            match self.peek() {
                None => break,
                Some(Token::Units) => {
                    if statements.iter().any(|s| matches!(s, Statement::Job(_))) {
                        return Err(ParseError::Invalid {
                            message: "units must be set before the first job".to_string(),
                            span,
                        });
                    }
                    units = Some(self.parse_units()?);
                }
                Some(Token::Machine) => statements.push(self.parse_machine()?),
                Some(Token::Load) => statements.push(self.parse_load()?),
                Some(Token::Turn | Token::Drill | Token::Mill) => {
                    statements.push(Statement::Job(self.parse_job()?))
                }
                Some(other) => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "a job (turn, drill, mill) or a setting".to_string(),
                        got: other.describe(),
                        span,
                    })
                }
            }
            self.end_of_line()?;
        }

        Ok(Sheet { units, statements })
    }

    fn parse_units(&mut self) -> Result<UnitSystem> {
        self.consume(Token::Units)?;
        let span = self.span();
        match self.peek() {
            Some(Token::Imperial) => {
                self.advance();
                Ok(UnitSystem::Imperial)
            }
            Some(Token::Metric) => {
                self.advance();
                Ok(UnitSystem::Metric)
            }
            Some(other) => Err(ParseError::UnexpectedToken {
                expected: "'imperial' or 'metric'".to_string(),
                got: other.describe(),
                span,
            }),
            None => Err(self.eof("'imperial' or 'metric'")),
        }
    }

    fn parse_machine(&mut self) -> Result<Statement> {
        let start = self.span().start;
        self.consume(Token::Machine)?;
        let name = self.expect_string()?;
        Ok(Statement::Machine {
            name,
            span: start..self.last_end(),
        })
    }

    fn parse_load(&mut self) -> Result<Statement> {
        let start = self.span().start;
        self.consume(Token::Load)?;
        let value_span = self.span();
        let value = self.expect_number()?;
        if value.fract() != 0.0 || !(1.0..=100.0).contains(&value) {
            return Err(ParseError::Invalid {
                message: format!("load must be a whole percentage from 1 to 100, got {}", value),
                span: value_span,
            });
        }
        Ok(Statement::Load {
            pct: value as u8,
            span: start..self.last_end(),
        })
    }

    fn parse_job(&mut self) -> Result<JobLine> {
        let start = self.span().start;
        let line = self.current_line;
        let kind = match self.peek() {
            Some(Token::Turn) => OperationKind::Turning,
            Some(Token::Drill) => OperationKind::Drilling,
            Some(Token::Mill) => OperationKind::Milling,
            _ => return Err(self.eof("a job")),
        };
        self.advance();

        let mut fields = Fields::default();
        let mut seen: Vec<Token> = Vec::new();

        while let Some(key) = self.peek().cloned() {
            if key == Token::Newline {
                break;
            }
            let span = self.span();
            if !applies(kind, &key) {
                return Err(match key {
                    Token::Number(_) | Token::Fraction(_) | Token::String(_) => {
                        ParseError::UnexpectedToken {
                            expected: "a keyword such as dia or rpm".to_string(),
                            got: key.describe(),
                            span,
                        }
                    }
                    _ => ParseError::NotApplicable {
                        key: key.describe().trim_matches('\'').to_string(),
                        operation: kind,
                        span,
                    },
                });
            }
            if seen.contains(&key) {
                return Err(ParseError::Duplicate {
                    key: key.describe().trim_matches('\'').to_string(),
                    span,
                });
            }
            self.advance();

            match key {
                Token::Diameter => fields.diameter = Some(self.expect_number()?),
                Token::Speed => fields.speed = Some(self.expect_number()?),
                Token::Rpm => fields.rpm = Some(self.expect_number()?),
                Token::FeedPerRev => fields.feed_per_rev = Some(self.expect_number()?),
                Token::FeedPerMin => fields.feed_per_min = Some(self.expect_number()?),
                Token::ChipLoad => fields.chip_load = Some(self.expect_number()?),
                Token::Flutes => fields.flutes = Some(self.expect_count()?),
                Token::Doc => fields.doc = Some(self.expect_number()?),
                Token::Woc => fields.woc = Some(self.expect_number()?),
                Token::Material => fields.material = Some(self.expect_string()?),
                Token::Insert => fields.insert = Some(self.expect_string()?),
                Token::Live => fields.live = true,
                Token::AutoLimit => fields.auto_limit = true,
                _ => {}
            }
            seen.push(key);
        }

        Ok(JobLine {
            operation: build(kind, &fields),
            live: fields.live,
            auto_limit: fields.auto_limit,
            line,
            span: start..self.last_end(),
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|(t, _)| t)
    }

    fn advance(&mut self) -> Option<&Token> {
        if let Some((token, _)) = self.tokens.get(self.position) {
            if *token == Token::Newline {
                self.current_line += 1;
            }
            self.position += 1;
        }
        self.tokens.get(self.position.checked_sub(1)?).map(|(t, _)| t)
    }

    /// Span of the next token, or an empty span at the end of input
    fn span(&self) -> Span {
        self.tokens
            .get(self.position)
            .map(|(_, s)| s.clone())
            .unwrap_or(self.end..self.end)
    }

    fn last_end(&self) -> usize {
        self.position
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(0, |(_, s)| s.end)
    }

    fn consume(&mut self, expected: Token) -> Result<()> {
        let span = self.span();
        match self.peek() {
            Some(token) if token == &expected => {
                self.advance();
                Ok(())
            }
            Some(other) => Err(ParseError::UnexpectedToken {
                expected: expected.describe(),
                got: other.describe(),
                span,
            }),
            None => Err(self.eof(&expected.describe())),
        }
    }

    fn expect_number(&mut self) -> Result<f64> {
        let span = self.span();
        match self.peek() {
            Some(Token::Number(n)) | Some(Token::Fraction(n)) => {
                let val = *n;
                self.advance();
                Ok(val)
            }
            Some(other) => Err(ParseError::UnexpectedToken {
                expected: "a number".to_string(),
                got: other.describe(),
                span,
            }),
            None => Err(self.eof("a number")),
        }
    }

    fn expect_count(&mut self) -> Result<u32> {
        let span = self.span();
        let value = self.expect_number()?;
        if value.fract() != 0.0 || value < 0.0 || value > u32::MAX as f64 {
            return Err(ParseError::Invalid {
                message: format!("flutes must be a whole number, got {}", value),
                span,
            });
        }
        Ok(value as u32)
    }

    fn expect_string(&mut self) -> Result<String> {
        let span = self.span();
        match self.peek() {
            Some(Token::String(s)) => {
                let val = s.clone();
                self.advance();
                Ok(val)
            }
            Some(other) => Err(ParseError::UnexpectedToken {
                expected: "a quoted name".to_string(),
                got: other.describe(),
                span,
            }),
            None => Err(self.eof("a quoted name")),
        }
    }

    fn end_of_line(&mut self) -> Result<()> {
        let span = self.span();
        match self.peek() {
            None => Ok(()),
            Some(Token::Newline) => {
                self.advance();
                Ok(())
            }
            Some(other) => Err(ParseError::UnexpectedToken {
                expected: "end of line".to_string(),
                got: other.describe(),
                span,
            }),
        }
    }

    fn skip_newlines(&mut self) {
        while self.peek() == Some(&Token::Newline) {
            self.advance();
        }
    }

    fn eof(&self, expected: &str) -> ParseError {
        ParseError::UnexpectedEof {
            expected: expected.to_string(),
            span: self.end..self.end,
        }
    }
}

/// Which keywords a job line accepts
fn applies(kind: OperationKind, key: &Token) -> bool {
    use OperationKind::*;
    match key {
        Token::Diameter
        | Token::Speed
        | Token::Rpm
        | Token::FeedPerMin
        | Token::Material
        | Token::AutoLimit => true,
        Token::FeedPerRev => matches!(kind, Turning | Drilling),
        Token::Insert => kind == Turning,
        Token::Doc => matches!(kind, Turning | Milling),
        Token::Live => matches!(kind, Drilling | Milling),
        Token::ChipLoad | Token::Flutes | Token::Woc => kind == Milling,
        _ => false,
    }
}

fn build(kind: OperationKind, f: &Fields) -> Operation {
    match kind {
        OperationKind::Turning => Operation::Turning(TurningRequest {
            diameter: f.diameter.into(),
            cutting_speed: f.speed.into(),
            rpm: f.rpm.into(),
            feed_per_rev: f.feed_per_rev.into(),
            feed_per_min: f.feed_per_min.into(),
            depth_of_cut: f.doc,
            material: f.material.clone(),
            insert: f.insert.clone(),
        }),
        OperationKind::Drilling => Operation::Drilling(DrillingRequest {
            diameter: f.diameter.into(),
            cutting_speed: f.speed.into(),
            rpm: f.rpm.into(),
            feed_per_rev: f.feed_per_rev.into(),
            feed_per_min: f.feed_per_min.into(),
            material: f.material.clone(),
        }),
        OperationKind::Milling => Operation::Milling(MillingRequest {
            diameter: f.diameter.into(),
            cutting_speed: f.speed.into(),
            rpm: f.rpm.into(),
            flutes: Some(f.flutes.unwrap_or(DEFAULT_FLUTES)).into(),
            chip_load: f.chip_load.into(),
            feed_per_min: f.feed_per_min.into(),
            axial_depth: f.doc,
            radial_width: f.woc,
            material: f.material.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::Input::{Known, Unknown};
    use pretty_assertions::assert_eq;

    const SHEET: &str = r#"# Shaft job
units imperial
machine "Haas ST-20Y"
load 60

turn dia 1.0 sfm 300 ipr 0.010 material "4140" insert "CNMG (Rough)"
drill dia 1/2 rpm 500 ipm 2 material "Cast Iron" live autolimit
mill dia 0.5 rpm 8000 flutes 4 ipt 0.002 doc 0.25 woc 0.1 material "6061 Aluminum"
"#;

    #[test]
    fn test_parse_full_sheet() {
        let sheet = parse(SHEET).expect("sheet should parse");
        assert_eq!(sheet.units, Some(UnitSystem::Imperial));
        assert_eq!(sheet.statements.len(), 5);
        assert!(matches!(&sheet.statements[0], Statement::Machine { name, .. } if name == "Haas ST-20Y"));
        assert!(matches!(sheet.statements[1], Statement::Load { pct: 60, .. }));

        let jobs: Vec<_> = sheet.jobs().collect();
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[0].line, 6);
        assert_eq!(jobs[1].line, 7);
        assert_eq!(jobs[2].line, 8);

        assert_eq!(
            jobs[0].operation,
            Operation::Turning(TurningRequest {
                diameter: Known(1.0),
                cutting_speed: Known(300.0),
                rpm: Unknown,
                feed_per_rev: Known(0.010),
                feed_per_min: Unknown,
                depth_of_cut: None,
                material: Some("4140".to_string()),
                insert: Some("CNMG (Rough)".to_string()),
            })
        );

        assert_eq!(jobs[1].kind(), OperationKind::Drilling);
        assert!(jobs[1].live);
        assert!(jobs[1].auto_limit);
        match &jobs[1].operation {
            Operation::Drilling(req) => assert_eq!(req.diameter, Known(0.5)),
            other => panic!("expected drilling, got {:?}", other),
        }

        match &jobs[2].operation {
            Operation::Milling(req) => {
                assert_eq!(req.flutes, Known(4));
                assert_eq!(req.axial_depth, Some(0.25));
                assert_eq!(req.radial_width, Some(0.1));
            }
            other => panic!("expected milling, got {:?}", other),
        }
    }

    #[test]
    fn test_job_span_covers_line() {
        let source = "drill dia 0.5 rpm 500 ipr 0.004\n";
        let sheet = parse(source).unwrap();
        let job = sheet.jobs().next().unwrap();
        assert_eq!(&source[job.span.clone()], "drill dia 0.5 rpm 500 ipr 0.004");
    }

    #[test]
    fn test_mill_defaults_to_four_flutes() {
        let sheet = parse("mill dia 0.5 rpm 8000 ipt 0.002").unwrap();
        let job = sheet.jobs().next().unwrap();
        match &job.operation {
            Operation::Milling(req) => assert_eq!(req.flutes, Known(DEFAULT_FLUTES)),
            other => panic!("expected milling, got {:?}", other),
        }
    }

    #[test]
    fn test_units_after_job_rejected() {
        let err = parse("turn dia 1 sfm 300 ipr 0.01\nunits metric\n").unwrap_err();
        assert!(matches!(err, ParseError::Invalid { .. }));
        assert_eq!(err.span(), 28..33);
    }

    #[test]
    fn test_keyword_not_applicable() {
        let err = parse("mill dia 0.5 rpm 8000 insert \"CNMG (Rough)\"").unwrap_err();
        assert_eq!(
            err,
            ParseError::NotApplicable {
                key: "insert".to_string(),
                operation: OperationKind::Milling,
                span: 22..28,
            }
        );
    }

    #[test]
    fn test_duplicate_key() {
        let err = parse("turn dia 1 dia 2 sfm 300 ipr 0.01").unwrap_err();
        assert!(matches!(err, ParseError::Duplicate { ref key, .. } if key == "dia"));
    }

    #[test]
    fn test_missing_value() {
        let err = parse("drill dia 0.5 rpm").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }));

        let err = parse("drill dia rpm 500").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { ref got, .. } if got == "'rpm'"));
    }

    #[test]
    fn test_invalid_load_and_flutes() {
        assert!(matches!(parse("load 150"), Err(ParseError::Invalid { .. })));
        assert!(matches!(parse("load 42.5"), Err(ParseError::Invalid { .. })));
        assert!(matches!(
            parse("mill dia 0.5 rpm 8000 flutes 2.5 ipt 0.002"),
            Err(ParseError::Invalid { .. })
        ));
    }

    #[test]
    fn test_lexer_error_has_span() {
        let err = parse("turn dia 1 @ 300").unwrap_err();
        assert_eq!(err, ParseError::Unrecognized { span: 11..12 });
    }

    #[test]
    fn test_render_points_at_line() {
        let source = "units imperial\nmill dia 0.5 rpm 8000 insert \"X\"\n";
        let err = parse(source).unwrap_err();
        let rendered = err.render("shop.cut", source);
        assert!(rendered.contains("'insert' does not apply to milling"), "{}", rendered);
        assert!(rendered.contains("shop.cut"), "{}", rendered);
        assert!(rendered.contains("remove this"), "{}", rendered);
    }
}
