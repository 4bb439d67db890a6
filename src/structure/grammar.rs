//! Composable grammar rules and their compiled boundary matchers.
//!
//! A language adapter describes each boundary header as a small rule tree
//! (terminal / sequence / choice / optional / repeat / named reference).
//! [`Grammar::compile`] resolves references and checks that every header
//! is anchored at an open brace; the result is a [`MatcherSet`] the
//! structural parser consults at each candidate token.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::error::{EngineError, Result};
use crate::lexer::{Token, TokenKind};
use crate::structure::BoundaryKind;

/// What a terminal rule matches, one non-trivia token at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenPattern {
    /// A keyword token with this exact text.
    Keyword(SmolStr),
    /// Any identifier.
    Ident,
    /// A single punctuation token with this character.
    Punct(char),
    /// Any token of the given kind.
    Kind(TokenKind),
    /// An open delimiter of the given kind, consumed through its
    /// matching close (by delimiter depth).
    Balanced(TokenKind),
}

/// A composable grammar rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Terminal(TokenPattern),
    Seq(Vec<Rule>),
    Choice(Vec<Rule>),
    Optional(Box<Rule>),
    Repeat(Box<Rule>),
    Repeat1(Box<Rule>),
    /// Reference to a named rule, resolved at compile time.
    Ref(SmolStr),
}

impl Rule {
    pub fn keyword(text: &str) -> Rule {
        Rule::Terminal(TokenPattern::Keyword(SmolStr::new(text)))
    }

    pub fn ident() -> Rule {
        Rule::Terminal(TokenPattern::Ident)
    }

    pub fn punct(c: char) -> Rule {
        Rule::Terminal(TokenPattern::Punct(c))
    }

    pub fn kind(kind: TokenKind) -> Rule {
        Rule::Terminal(TokenPattern::Kind(kind))
    }

    pub fn balanced(open: TokenKind) -> Rule {
        Rule::Terminal(TokenPattern::Balanced(open))
    }

    pub fn open_brace() -> Rule {
        Rule::kind(TokenKind::OpenBrace)
    }

    pub fn seq(rules: impl IntoIterator<Item = Rule>) -> Rule {
        Rule::Seq(rules.into_iter().collect())
    }

    pub fn choice(rules: impl IntoIterator<Item = Rule>) -> Rule {
        Rule::Choice(rules.into_iter().collect())
    }

    pub fn optional(rule: Rule) -> Rule {
        Rule::Optional(Box::new(rule))
    }

    pub fn repeat(rule: Rule) -> Rule {
        Rule::Repeat(Box::new(rule))
    }

    pub fn repeat1(rule: Rule) -> Rule {
        Rule::Repeat1(Box::new(rule))
    }

    pub fn reference(name: &str) -> Rule {
        Rule::Ref(SmolStr::new(name))
    }

    /// Whether every successful match of this rule necessarily ends by
    /// consuming an open brace. Used as the compile-time anchor check.
    fn ends_at_open_brace(&self, rules: &FxHashMap<SmolStr, Rule>) -> bool {
        match self {
            Rule::Terminal(TokenPattern::Kind(TokenKind::OpenBrace)) => true,
            Rule::Terminal(_) => false,
            Rule::Seq(items) => items
                .last()
                .is_some_and(|last| last.ends_at_open_brace(rules)),
            Rule::Choice(items) => {
                !items.is_empty() && items.iter().all(|r| r.ends_at_open_brace(rules))
            }
            // Optional/repeated tails may match nothing.
            Rule::Optional(_) | Rule::Repeat(_) | Rule::Repeat1(_) => false,
            Rule::Ref(name) => rules
                .get(name)
                .is_some_and(|r| r.ends_at_open_brace(rules)),
        }
    }

    fn check_refs(&self, rules: &FxHashMap<SmolStr, Rule>) -> Result<()> {
        match self {
            Rule::Terminal(_) => Ok(()),
            Rule::Seq(items) | Rule::Choice(items) => {
                items.iter().try_for_each(|r| r.check_refs(rules))
            }
            Rule::Optional(inner) | Rule::Repeat(inner) | Rule::Repeat1(inner) => {
                inner.check_refs(rules)
            }
            Rule::Ref(name) => match rules.get(name) {
                Some(_) => Ok(()),
                None => Err(EngineError::UnknownRule(name.to_string())),
            },
        }
    }
}

/// A set of named rules plus the boundary kinds they open.
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    rules: FxHashMap<SmolStr, Rule>,
    boundaries: Vec<(BoundaryKind, SmolStr)>,
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a named rule.
    pub fn define(mut self, name: &str, rule: Rule) -> Self {
        self.rules.insert(SmolStr::new(name), rule);
        self
    }

    /// Register a named rule as the header of a boundary kind.
    /// Matchers are tried in registration order.
    pub fn boundary(mut self, kind: BoundaryKind, rule_name: &str) -> Self {
        self.boundaries.push((kind, SmolStr::new(rule_name)));
        self
    }

    /// Resolve references and anchor-check every boundary rule.
    pub fn compile(&self) -> Result<MatcherSet> {
        for rule in self.rules.values() {
            rule.check_refs(&self.rules)?;
        }
        let mut matchers = Vec::with_capacity(self.boundaries.len());
        for (kind, name) in &self.boundaries {
            let rule = self
                .rules
                .get(name)
                .ok_or_else(|| EngineError::UnknownRule(name.to_string()))?;
            if !rule.ends_at_open_brace(&self.rules) {
                return Err(EngineError::UnanchoredRule(name.to_string()));
            }
            matchers.push(BoundaryMatcher {
                kind: *kind,
                rule: rule.clone(),
            });
        }
        Ok(MatcherSet {
            matchers,
            rules: self.rules.clone(),
        })
    }

    /// Grammar for the engine's reference language.
    pub fn c_like() -> Self {
        use TokenKind::OpenParen;
        Grammar::new()
            .define("visibility", Rule::optional(Rule::keyword("pub")))
            .define(
                "return_type",
                Rule::optional(Rule::seq([
                    Rule::punct('-'),
                    Rule::punct('>'),
                    Rule::ident(),
                ])),
            )
            .define(
                "function",
                Rule::seq([
                    Rule::reference("visibility"),
                    Rule::keyword("fn"),
                    Rule::ident(),
                    Rule::balanced(OpenParen),
                    Rule::reference("return_type"),
                    Rule::open_brace(),
                ]),
            )
            .define(
                "struct_def",
                Rule::seq([
                    Rule::reference("visibility"),
                    Rule::keyword("struct"),
                    Rule::ident(),
                    Rule::open_brace(),
                ]),
            )
            .define(
                "module",
                Rule::seq([
                    Rule::reference("visibility"),
                    Rule::keyword("mod"),
                    Rule::ident(),
                    Rule::open_brace(),
                ]),
            )
            .boundary(BoundaryKind::Function, "function")
            .boundary(BoundaryKind::Struct, "struct_def")
            .boundary(BoundaryKind::Module, "module")
    }
}

/// One successful header match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOutcome {
    pub kind: BoundaryKind,
    /// Raw token index just past the consumed open brace.
    pub end: usize,
    /// Raw token index of the open brace itself.
    pub brace: usize,
}

/// Compiled matchers, one per boundary kind, tried in order.
#[derive(Debug, Clone)]
pub struct MatcherSet {
    matchers: Vec<BoundaryMatcher>,
    rules: FxHashMap<SmolStr, Rule>,
}

#[derive(Debug, Clone)]
struct BoundaryMatcher {
    kind: BoundaryKind,
    rule: Rule,
}

impl MatcherSet {
    /// Try to recognize a boundary header starting at raw token index
    /// `pos`. Trivia is skipped transparently.
    pub fn match_at(&self, tokens: &[Token], text: &str, pos: usize) -> Option<MatchOutcome> {
        for matcher in &self.matchers {
            let ends = self.match_rule(&matcher.rule, tokens, text, pos);
            // Prefer the longest header when a rule is ambiguous.
            if let Some(&end) = ends.iter().max() {
                let brace = last_non_trivia_before(tokens, end)?;
                if tokens[brace].kind == TokenKind::OpenBrace {
                    return Some(MatchOutcome {
                        kind: matcher.kind,
                        end,
                        brace,
                    });
                }
            }
        }
        None
    }

    /// All raw positions the rule can end at when matched at `pos`.
    ///
    /// Header rules are tiny, so full backtracking via position sets is
    /// cheaper than it looks and keeps Optional/Choice exact.
    fn match_rule(&self, rule: &Rule, tokens: &[Token], text: &str, pos: usize) -> Vec<usize> {
        match rule {
            Rule::Terminal(pattern) => match_terminal(pattern, tokens, text, pos)
                .map(|end| vec![end])
                .unwrap_or_default(),
            Rule::Seq(items) => {
                let mut ends = vec![pos];
                for item in items {
                    let mut next = Vec::new();
                    for &p in &ends {
                        for e in self.match_rule(item, tokens, text, p) {
                            if !next.contains(&e) {
                                next.push(e);
                            }
                        }
                    }
                    if next.is_empty() {
                        return Vec::new();
                    }
                    ends = next;
                }
                ends
            }
            Rule::Choice(items) => {
                let mut ends = Vec::new();
                for item in items {
                    for e in self.match_rule(item, tokens, text, pos) {
                        if !ends.contains(&e) {
                            ends.push(e);
                        }
                    }
                }
                ends
            }
            Rule::Optional(inner) => {
                let mut ends = self.match_rule(inner, tokens, text, pos);
                if !ends.contains(&pos) {
                    ends.push(pos);
                }
                ends
            }
            Rule::Repeat(inner) => self.match_repeat(inner, tokens, text, pos, true),
            Rule::Repeat1(inner) => self.match_repeat(inner, tokens, text, pos, false),
            Rule::Ref(name) => match self.rules.get(name) {
                Some(resolved) => self.match_rule(resolved, tokens, text, pos),
                None => Vec::new(),
            },
        }
    }

    fn match_repeat(
        &self,
        inner: &Rule,
        tokens: &[Token],
        text: &str,
        pos: usize,
        allow_empty: bool,
    ) -> Vec<usize> {
        let mut ends = Vec::new();
        if allow_empty {
            ends.push(pos);
        }
        let mut frontier = vec![pos];
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for &p in &frontier {
                for e in self.match_rule(inner, tokens, text, p) {
                    // Zero-width repetition would loop forever.
                    if e > p && !ends.contains(&e) {
                        ends.push(e);
                        next.push(e);
                    }
                }
            }
            frontier = next;
        }
        ends
    }
}

/// Raw index of the first non-trivia token at or after `pos`.
fn next_non_trivia(tokens: &[Token], pos: usize) -> Option<usize> {
    (pos..tokens.len()).find(|&i| !tokens[i].kind.is_trivia())
}

fn last_non_trivia_before(tokens: &[Token], end: usize) -> Option<usize> {
    (0..end.min(tokens.len())).rev().find(|&i| !tokens[i].kind.is_trivia())
}

fn match_terminal(
    pattern: &TokenPattern,
    tokens: &[Token],
    text: &str,
    pos: usize,
) -> Option<usize> {
    let i = next_non_trivia(tokens, pos)?;
    let token = &tokens[i];
    let token_text = &text[token.span.start as usize..token.span.end as usize];
    match pattern {
        TokenPattern::Keyword(kw) => {
            (token.kind == TokenKind::Keyword && token_text == kw.as_str()).then_some(i + 1)
        }
        TokenPattern::Ident => (token.kind == TokenKind::Ident).then_some(i + 1),
        TokenPattern::Punct(c) => {
            (token.kind == TokenKind::Punct && token_text.chars().next() == Some(*c))
                .then_some(i + 1)
        }
        TokenPattern::Kind(kind) => (token.kind == *kind).then_some(i + 1),
        TokenPattern::Balanced(open) => {
            if token.kind != *open {
                return None;
            }
            let close_kind = open.matching_close()?;
            let open_depth = token.depth;
            for j in i + 1..tokens.len() {
                let t = &tokens[j];
                if t.kind == close_kind && t.depth == open_depth {
                    return Some(j + 1);
                }
                if t.kind.is_close_delimiter() && t.depth < open_depth {
                    return None; // escaped the group without closing it
                }
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{LanguageSpec, StreamingLexer};
    use std::rc::Rc;

    fn lex(text: &str) -> (Vec<Token>, String) {
        let mut lexer = StreamingLexer::new(Rc::new(LanguageSpec::c_like()));
        let tokens = lexer.tokenize(text).to_vec();
        (tokens, text.to_string())
    }

    fn compiled() -> MatcherSet {
        Grammar::c_like().compile().unwrap()
    }

    #[test]
    fn test_compile_rejects_unknown_ref() {
        let err = Grammar::new()
            .define("broken", Rule::reference("missing"))
            .boundary(BoundaryKind::Block, "broken")
            .compile()
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownRule(_)));
    }

    #[test]
    fn test_compile_rejects_unanchored_rule() {
        let err = Grammar::new()
            .define("floaty", Rule::seq([Rule::keyword("fn"), Rule::ident()]))
            .boundary(BoundaryKind::Function, "floaty")
            .compile()
            .unwrap_err();
        assert!(matches!(err, EngineError::UnanchoredRule(_)));
    }

    #[test]
    fn test_match_function_header() {
        let (tokens, text) = lex("fn main() {");
        let m = compiled().match_at(&tokens, &text, 0).unwrap();
        assert_eq!(m.kind, BoundaryKind::Function);
        assert_eq!(tokens[m.brace].kind, TokenKind::OpenBrace);
        assert_eq!(m.end, tokens.len());
    }

    #[test]
    fn test_match_function_with_visibility_and_return() {
        let (tokens, text) = lex("pub fn add(a, b) -> int {");
        let m = compiled().match_at(&tokens, &text, 0).unwrap();
        assert_eq!(m.kind, BoundaryKind::Function);
        assert_eq!(m.end, tokens.len());
    }

    #[test]
    fn test_match_fails_on_missing_close_paren() {
        let (tokens, text) = lex("fn test(a{ }");
        assert!(compiled().match_at(&tokens, &text, 0).is_none());
    }

    #[test]
    fn test_match_struct_header() {
        let (tokens, text) = lex("struct Point {");
        let m = compiled().match_at(&tokens, &text, 0).unwrap();
        assert_eq!(m.kind, BoundaryKind::Struct);
    }

    #[test]
    fn test_match_skips_leading_trivia() {
        let (tokens, text) = lex("  /* doc */ fn f() {");
        let m = compiled().match_at(&tokens, &text, 0).unwrap();
        assert_eq!(m.kind, BoundaryKind::Function);
    }

    #[test]
    fn test_no_match_on_plain_ident() {
        let (tokens, text) = lex("banana {");
        assert!(compiled().match_at(&tokens, &text, 0).is_none());
    }
}
