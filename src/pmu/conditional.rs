//! Rewrite of `THEN if CONDITION else OTHERWISE` metric formulas into the ternary
//! `CONDITION ? THEN : OTHERWISE` understood by the expression evaluator.
//!
//! The formula is lexed into nesting levels (one per pair of parentheses), each level is split
//! around its first `if` and the `else` matching it, and the resulting tree is rendered back to
//! text. The `then` operand is everything between the start of the enclosing level and the `if`;
//! the `otherwise` operand runs from the `else` to the end of the enclosing level.

use crate::{Error, Result};

/// Lexical pieces of one nesting level of a formula.
#[derive(Debug, Clone, PartialEq)]
enum Piece<'a> {
    Text(&'a str),
    If,
    Else,
    /// Parenthesized sub-formula, `source` is the text between the parentheses.
    Group {
        body: Vec<Piece<'a>>,
        source: &'a str,
        closed: bool,
    },
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.'
}

/// No text or group besides whitespace.
fn is_blank(pieces: &[Piece]) -> bool {
    pieces.iter().all(|p| match p {
        Piece::Text(t) => t.trim().is_empty(),
        _ => false,
    })
}

fn push_text<'a>(pieces: &mut Vec<Piece<'a>>, text: &'a str) {
    if !text.is_empty() {
        pieces.push(Piece::Text(text));
    }
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Lex up to the end of the input or, when `nested`, up to the `)` closing the current level.
    ///
    /// Returns the pieces and whether the level was closed.
    fn level(&mut self, nested: bool) -> (Vec<Piece<'a>>, bool) {
        let src = self.src;
        let bytes = src.as_bytes();
        let mut pieces = Vec::new();
        let mut text_start = self.pos;
        while self.pos < bytes.len() {
            let b = bytes[self.pos];
            if b == b'(' {
                push_text(&mut pieces, &src[text_start..self.pos]);
                self.pos += 1;
                let body_start = self.pos;
                let (body, closed) = self.level(true);
                let body_end = if closed { self.pos - 1 } else { self.pos };
                pieces.push(Piece::Group {
                    body,
                    source: &src[body_start..body_end],
                    closed,
                });
                text_start = self.pos;
            } else if b == b')' && nested {
                push_text(&mut pieces, &src[text_start..self.pos]);
                self.pos += 1;
                return (pieces, true);
            } else if is_word_byte(b) {
                let word_start = self.pos;
                while self.pos < bytes.len() && is_word_byte(bytes[self.pos]) {
                    self.pos += 1;
                }
                let keyword = match &src[word_start..self.pos] {
                    "if" => Some(Piece::If),
                    "else" => Some(Piece::Else),
                    _ => None,
                };
                if let Some(keyword) = keyword {
                    push_text(&mut pieces, &src[text_start..word_start]);
                    pieces.push(keyword);
                    text_start = self.pos;
                }
            } else {
                self.pos += 1;
            }
        }
        push_text(&mut pieces, &src[text_start..]);
        (pieces, false)
    }
}

/// One nesting level of a formula with its conditional resolved.
#[derive(Debug, PartialEq)]
enum Expr<'a> {
    /// Text and groups kept as they are.
    Sequence(Vec<Part<'a>>),
    /// `then if condition else otherwise`.
    Conditional {
        condition: Box<Expr<'a>>,
        then: Box<Expr<'a>>,
        otherwise: Box<Expr<'a>>,
    },
}

#[derive(Debug, PartialEq)]
enum Part<'a> {
    Text(&'a str),
    Group { inner: Expr<'a>, closed: bool },
}

/// Build the tree of one level, `source` is its text for error messages.
fn build<'a>(mut pieces: Vec<Piece<'a>>, source: &'a str) -> Result<Expr<'a>> {
    let if_at = match pieces.iter().position(|p| *p == Piece::If) {
        Some(i) => i,
        None => {
            return pieces
                .into_iter()
                .map(|piece| match piece {
                    Piece::Text(t) => Ok(Part::Text(t)),
                    Piece::If => Ok(Part::Text("if")),
                    Piece::Else => Ok(Part::Text("else")),
                    Piece::Group {
                        body,
                        source,
                        closed,
                    } => Ok(Part::Group {
                        inner: build(body, source)?,
                        closed,
                    }),
                })
                .collect::<Result<Vec<_>>>()
                .map(Expr::Sequence);
        }
    };

    // `else` pairs with the nearest unpaired `if` of the same level
    let mut unpaired = 0;
    let else_at = pieces[if_at..]
        .iter()
        .position(|p| {
            match p {
                Piece::If => unpaired += 1,
                Piece::Else => unpaired -= 1,
                _ => {}
            }
            unpaired == 0
        })
        .map(|i| i + if_at)
        .ok_or_else(|| Error::ConditionalSyntax(String::from(source.trim())))?;

    let otherwise = pieces.split_off(else_at + 1);
    pieces.truncate(else_at);
    let condition = pieces.split_off(if_at + 1);
    pieces.truncate(if_at);
    if is_blank(&pieces) || is_blank(&condition) || is_blank(&otherwise) {
        return Err(Error::ConditionalSyntax(String::from(source.trim())));
    }
    Ok(Expr::Conditional {
        condition: Box::new(build(condition, source)?),
        then: Box::new(build(pieces, source)?),
        otherwise: Box::new(build(otherwise, source)?),
    })
}

/// Output buffer that can defer a single space until more text follows.
#[derive(Default)]
struct Renderer {
    out: String,
    pending_space: bool,
}

impl Renderer {
    fn push(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.pending_space {
            self.out.push(' ');
            self.pending_space = false;
        }
        self.out.push_str(text);
    }

    /// Render `expr`. `nested` is set when `expr` is the whole body of a parenthesized group.
    ///
    /// A conditional at the outermost level keeps the whitespace around it. A conditional filling
    /// a group is spaced as ` CONDITION ? THEN : OTHERWISE` with the `then` operand's leading
    /// whitespace kept after the `?`, and a space is emitted after the group's `)` whenever more
    /// text follows it. Reference outputs of existing metric files depend on this spacing.
    fn render(&mut self, expr: &Expr, nested: bool) {
        match expr {
            Expr::Sequence(parts) => {
                for part in parts {
                    match part {
                        Part::Text(text) => self.push(text),
                        Part::Group { inner, closed } => {
                            self.push("(");
                            self.render(inner, true);
                            if *closed {
                                self.push(")");
                            }
                            if let Expr::Conditional { .. } = inner {
                                self.pending_space = true;
                            }
                        }
                    }
                }
            }
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => {
                let condition = render_to_string(condition);
                let then = render_to_string(then);
                let otherwise = render_to_string(otherwise);
                let rendered = if nested {
                    format!(
                        " {} ? {} : {}",
                        condition.trim(),
                        then.trim_end(),
                        otherwise.trim_start()
                    )
                } else {
                    let lead = &then[..then.len() - then.trim_start().len()];
                    let trail = &otherwise[otherwise.trim_end().len()..];
                    format!(
                        "{}{} ? {} : {}{}",
                        lead,
                        condition.trim(),
                        then.trim(),
                        otherwise.trim(),
                        trail
                    )
                };
                self.push(&rendered);
            }
        }
    }
}

fn render_to_string(expr: &Expr) -> String {
    let mut renderer = Renderer::default();
    renderer.render(expr, false);
    renderer.out
}

/// Rewrite every `THEN if CONDITION else OTHERWISE` in `formula` into
/// `CONDITION ? THEN : OTHERWISE`.
///
/// Formulas without an `if` are returned unchanged. An `if` without an `else` on the same
/// nesting level, or with a blank operand, is a `ConditionalSyntax` error naming the offending
/// level.
pub fn transform_conditional(formula: &str) -> Result<String> {
    if !formula.contains("if") {
        return Ok(String::from(formula));
    }
    let (pieces, _) = Lexer {
        src: formula,
        pos: 0,
    }
    .level(false);
    let expr = build(pieces, formula)?;
    Ok(render_to_string(&expr))
}
