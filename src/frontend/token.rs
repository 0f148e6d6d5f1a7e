/// Kind of a lexeme produced by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    Char,
    Date,
    False,
    Integer,
    Real,
    String,
    True,

    // Operators & punctuation
    Plus,         // +
    Minus,        // -
    Star,         // *
    Slash,        // /
    Ampersand,    // &
    Caret,        // ^
    Colon,        // :
    Comma,        // ,
    LParen,       // (
    RParen,       // )
    LBracket,     // [
    RBracket,     // ]
    Dot,          // .
    Eq,           // =
    NotEq,        // <>
    Lt,           // <
    LtEq,         // <=
    Gt,           // >
    GtEq,         // >=
    Assign,       // <-

    // Keywords
    And,
    Append,
    Array,
    Boolean,
    ByVal,
    ByRef,
    Call,
    Case,
    CharType,
    Class,
    CloseFile,
    Constant,
    DateType,
    Declare,
    Define,
    Div,
    Else,
    EndCase,
    EndClass,
    EndFunction,
    EndIf,
    EndProcedure,
    EndType,
    EndWhile,
    For,
    Function,
    GetRecord,
    If,
    Inherits,
    Input,
    IntegerType,
    Mod,
    New,
    Next,
    Not,
    OpenFile,
    Or,
    Otherwise,
    Output,
    Procedure,
    Private,
    Public,
    PutRecord,
    Random,
    Read,
    ReadFile,
    RealType,
    Repeat,
    Return,
    Returns,
    Seek,
    Step,
    StringType,
    Super,
    Then,
    Type,
    Until,
    While,
    Write,
    WriteFile,

    // Special
    Ident,
    Eol,
    Eof,
    Error,
}

/// Reserved words, sorted by spelling so lookups can binary search.
const KEYWORDS: &[(&str, TokenKind)] = &[
    ("AND", TokenKind::And),
    ("APPEND", TokenKind::Append),
    ("ARRAY", TokenKind::Array),
    ("BOOLEAN", TokenKind::Boolean),
    ("BYREF", TokenKind::ByRef),
    ("BYVAL", TokenKind::ByVal),
    ("CALL", TokenKind::Call),
    ("CASE", TokenKind::Case),
    ("CHAR", TokenKind::CharType),
    ("CLASS", TokenKind::Class),
    ("CLOSEFILE", TokenKind::CloseFile),
    ("CONSTANT", TokenKind::Constant),
    ("DATE", TokenKind::DateType),
    ("DECLARE", TokenKind::Declare),
    ("DEFINE", TokenKind::Define),
    ("DIV", TokenKind::Div),
    ("ELSE", TokenKind::Else),
    ("ENDCASE", TokenKind::EndCase),
    ("ENDCLASS", TokenKind::EndClass),
    ("ENDFUNCTION", TokenKind::EndFunction),
    ("ENDIF", TokenKind::EndIf),
    ("ENDPROCEDURE", TokenKind::EndProcedure),
    ("ENDTYPE", TokenKind::EndType),
    ("ENDWHILE", TokenKind::EndWhile),
    ("FALSE", TokenKind::False),
    ("FOR", TokenKind::For),
    ("FUNCTION", TokenKind::Function),
    ("GETRECORD", TokenKind::GetRecord),
    ("IF", TokenKind::If),
    ("INHERITS", TokenKind::Inherits),
    ("INPUT", TokenKind::Input),
    ("INTEGER", TokenKind::IntegerType),
    ("MOD", TokenKind::Mod),
    ("NEW", TokenKind::New),
    ("NEXT", TokenKind::Next),
    ("NOT", TokenKind::Not),
    ("OPENFILE", TokenKind::OpenFile),
    ("OR", TokenKind::Or),
    ("OTHERWISE", TokenKind::Otherwise),
    ("OUTPUT", TokenKind::Output),
    ("PRIVATE", TokenKind::Private),
    ("PROCEDURE", TokenKind::Procedure),
    ("PUBLIC", TokenKind::Public),
    ("PUTRECORD", TokenKind::PutRecord),
    ("RANDOM", TokenKind::Random),
    ("READ", TokenKind::Read),
    ("READFILE", TokenKind::ReadFile),
    ("REAL", TokenKind::RealType),
    ("REPEAT", TokenKind::Repeat),
    ("RETURN", TokenKind::Return),
    ("RETURNS", TokenKind::Returns),
    ("SEEK", TokenKind::Seek),
    ("STEP", TokenKind::Step),
    ("STRING", TokenKind::StringType),
    ("SUPER", TokenKind::Super),
    ("THEN", TokenKind::Then),
    ("TRUE", TokenKind::True),
    ("TYPE", TokenKind::Type),
    ("UNTIL", TokenKind::Until),
    ("WHILE", TokenKind::While),
    ("WRITE", TokenKind::Write),
    ("WRITEFILE", TokenKind::WriteFile),
];

impl TokenKind {
    /// Resolves identifier text to a keyword kind, or `Ident` when it is not reserved.
    pub fn keyword(text: &str) -> TokenKind {
        KEYWORDS
            .binary_search_by(|(word, _)| (*word).cmp(text))
            .map(|i| KEYWORDS[i].1)
            .unwrap_or(TokenKind::Ident)
    }

    /// Returns true for the reserved-word kinds (including `TRUE`/`FALSE`).
    #[allow(dead_code)]
    pub fn is_keyword(self) -> bool {
        KEYWORDS.iter().any(|(_, kind)| *kind == self)
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::Char
                | TokenKind::Date
                | TokenKind::False
                | TokenKind::Integer
                | TokenKind::Real
                | TokenKind::String
                | TokenKind::True
        )
    }

    pub fn is_operator(self) -> bool {
        matches!(
            self,
            TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::Ampersand
                | TokenKind::Caret
                | TokenKind::Colon
                | TokenKind::Comma
                | TokenKind::LParen
                | TokenKind::RParen
                | TokenKind::LBracket
                | TokenKind::RBracket
                | TokenKind::Dot
                | TokenKind::Eq
                | TokenKind::NotEq
                | TokenKind::Lt
                | TokenKind::LtEq
                | TokenKind::Gt
                | TokenKind::GtEq
                | TokenKind::Assign
        )
    }
}

/// One lexeme.
///
/// `lexeme` borrows from the source buffer; for `TokenKind::Error` it holds
/// the diagnostic message instead. `start` is the byte offset of the lexeme
/// in the source and `line` is the line the lexeme started on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub lexeme: &'src str,
    pub start: usize,
    pub line: u32,
}

impl<'src> Token<'src> {
    pub fn len(&self) -> usize {
        self.lexeme.len()
    }

    pub fn is_error(&self) -> bool {
        self.kind == TokenKind::Error
    }
}

impl std::fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TokenKind::Eol => write!(f, "<EOL>"),
            TokenKind::Eof => write!(f, "<EOF>"),
            _ => write!(f, "{}", self.lexeme),
        }
    }
}
