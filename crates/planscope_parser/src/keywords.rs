use std::hash::Hash;

/// Try to get a keyword from a string, ignoring string casing.
pub fn keyword_from_str(s: &str) -> Option<Keyword> {
    let s = unicase::Ascii::new(s);
    let idx = match KEYWORD_STRINGS.binary_search(&s) {
        Ok(idx) => idx,
        Err(_) => return None,
    };
    Some(ALL_KEYWORDS[idx])
}

/// Generate an enum of keywords.
///
/// Keywords must be listed in sorted order.
macro_rules! define_keywords {
    ($($ident:ident),*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Keyword {
            $($ident),*
        }

        pub const ALL_KEYWORDS: &'static [Keyword] = &[
            $(Keyword::$ident),*
        ];

        pub const KEYWORD_STRINGS: &'static [unicase::Ascii<&'static str>] = &[
            $(unicase::Ascii::new(stringify!($ident)),)*
        ];
    };
}

#[rustfmt::skip]
define_keywords!(
    ANALYZE,
    AND,
    AS,
    BIGINT,
    BOOLEAN,
    BY,
    CODEGEN,
    COMPUTE,
    COST,
    CREATE,
    CROSS,
    DOUBLE,
    EXPLAIN,
    EXTENDED,
    FALSE,
    FROM,
    GROUP,
    INNER,
    INSERT,
    INT,
    INTEGER,
    INTO,
    JOIN,
    LIMIT,
    NOT,
    NULL,
    ON,
    OR,
    REFRESH,
    RESET,
    SELECT,
    SET,
    SHOW,
    STATISTICS,
    STORED,
    STRING,
    TABLE,
    TBLPROPERTIES,
    TO,
    TRUE,
    WHERE
);

/// Keywords that can't be used as a table alias without `AS`.
pub const RESERVED_FOR_TABLE_ALIAS: &[Keyword] = &[
    Keyword::AS,
    Keyword::CROSS,
    Keyword::FROM,
    Keyword::GROUP,
    Keyword::INNER,
    Keyword::JOIN,
    Keyword::LIMIT,
    Keyword::ON,
    Keyword::SELECT,
    Keyword::WHERE,
];

/// Keywords that can't be used as a column alias without `AS`.
pub const RESERVED_FOR_COLUMN_ALIAS: &[Keyword] = &[
    Keyword::AND,
    Keyword::AS,
    Keyword::FROM,
    Keyword::GROUP,
    Keyword::LIMIT,
    Keyword::NOT,
    Keyword::OR,
    Keyword::SELECT,
    Keyword::WHERE,
];
