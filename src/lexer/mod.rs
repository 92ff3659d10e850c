use logos::Logos;

/// Tokens for setup sheets.
/// One job per line, keyword/value pairs in any order.

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\f\r]+|#[^\n]*")]
#[logos(error = LexerError)]
pub enum Token {
    // Literals
    #[regex(r"-?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    /// Fractional inch sizes, `1/2`, `3/8`
    #[regex(r"[0-9]+/[0-9]+", parse_fraction)]
    Fraction(f64),

    #[regex(r#""[^"\n]*""#, |lex| lex.slice()[1..lex.slice().len() - 1].to_string())]
    String(String),

    // Keywords - sheet settings
    #[token("units")]
    Units,

    #[token("metric")]
    Metric,

    #[token("imperial")]
    Imperial,

    #[token("machine")]
    Machine,

    #[token("load")]
    Load,

    // Keywords - operations
    #[token("turn")]
    Turn,

    #[token("drill")]
    Drill,

    #[token("mill")]
    Mill,

    // Keywords - cut values
    #[token("dia")]
    #[token("diameter")]
    Diameter,

    #[token("sfm")]
    #[token("speed")]
    Speed,

    #[token("rpm")]
    Rpm,

    #[token("ipr")]
    #[token("fpr")]
    FeedPerRev,

    #[token("ipm")]
    #[token("fpm")]
    FeedPerMin,

    #[token("ipt")]
    #[token("chipload")]
    ChipLoad,

    #[token("flutes")]
    Flutes,

    #[token("doc")]
    Doc,

    #[token("woc")]
    Woc,

    #[token("material")]
    Material,

    #[token("insert")]
    Insert,

    // Flags
    #[token("live")]
    Live,

    #[token("autolimit")]
    AutoLimit,

    #[token("\n")]
    Newline,
}

fn parse_fraction(lex: &mut logos::Lexer<Token>) -> Option<f64> {
    let (num, den) = lex.slice().split_once('/')?;
    let num: f64 = num.parse().ok()?;
    let den: f64 = den.parse().ok()?;
    if den == 0.0 {
        None
    } else {
        Some(num / den)
    }
}

impl Token {
    /// How the token reads in error messages
    pub fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::Fraction(n) => format!("fraction {}", n),
            Token::String(s) => format!("\"{}\"", s),
            Token::Newline => "end of line".to_string(),
            other => format!("'{}'", other.keyword()),
        }
    }

    fn keyword(&self) -> &'static str {
        match self {
            Token::Units => "units",
            Token::Metric => "metric",
            Token::Imperial => "imperial",
            Token::Machine => "machine",
            Token::Load => "load",
            Token::Turn => "turn",
            Token::Drill => "drill",
            Token::Mill => "mill",
            Token::Diameter => "dia",
            Token::Speed => "sfm",
            Token::Rpm => "rpm",
            Token::FeedPerRev => "ipr",
            Token::FeedPerMin => "ipm",
            Token::ChipLoad => "ipt",
            Token::Flutes => "flutes",
            Token::Doc => "doc",
            Token::Woc => "woc",
            Token::Material => "material",
            Token::Insert => "insert",
            Token::Live => "live",
            Token::AutoLimit => "autolimit",
            Token::Number(_) | Token::Fraction(_) | Token::String(_) | Token::Newline => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LexerError;

impl std::fmt::Display for LexerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "lexer error")
    }
}

impl std::error::Error for LexerError {}

/// Lex the input string into tokens, stopping at the first unrecognized input
pub fn lex(input: &str) -> Result<Vec<(Token, logos::Span)>, logos::Span> {
    Token::lexer(input)
        .spanned()
        .map(|(result, span)| match result {
            Ok(token) => Ok((token, span)),
            Err(LexerError) => Err(span),
        })
        .collect()
}
